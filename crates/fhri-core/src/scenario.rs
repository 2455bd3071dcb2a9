// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Scenario Classifier
// ─────────────────────────────────────────────────────────────────────
//! Maps a free-text question to a [`Scenario`] and its profile.
//!
//! Matchers are tried in a fixed priority order; the first hit wins and
//! `Scenario::Default` catches everything else, so classification is
//! total. A valid manual override short-circuits detection; an invalid
//! one is logged, reported as a warning and ignored.

use std::sync::LazyLock;

use regex::Regex;

use fhri_types::{Scenario, ScenarioProfile, ScenarioTable};

use crate::text::COMPARATIVE_RE;

/// How the scenario was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioSource {
    Override,
    Detected,
    Fallback,
}

/// Result of classifying one question.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub scenario: Scenario,
    pub profile: ScenarioProfile,
    pub source: ScenarioSource,
    /// Text fragment that triggered the match, if detected.
    pub matched: Option<String>,
    pub warnings: Vec<String>,
}

struct ScenarioMatcher {
    scenario: Scenario,
    patterns: Vec<Regex>,
}

impl ScenarioMatcher {
    fn new(scenario: Scenario, patterns: &[&str], keywords: &[&str]) -> Self {
        let mut compiled: Vec<Regex> = patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){p}")).unwrap())
            .collect();
        if !keywords.is_empty() {
            let alternation = keywords
                .iter()
                .map(|k| regex::escape(k))
                .collect::<Vec<_>>()
                .join("|");
            compiled.push(Regex::new(&format!(r"(?i)\b(?:{alternation})\b")).unwrap());
        }
        Self {
            scenario,
            patterns: compiled,
        }
    }

    fn find<'q>(&self, question: &'q str) -> Option<&'q str> {
        self.patterns
            .iter()
            .find_map(|re| re.find(question).map(|m| m.as_str()))
    }
}

/// Priority order: comparisons first (they mention several tickers and
/// often "better"), then live quotes, crypto, regulatory, advice, and the
/// progressively broader metric/fundamental/directional/news buckets.
static MATCHERS: LazyLock<Vec<ScenarioMatcher>> = LazyLock::new(|| {
    vec![
        ScenarioMatcher {
            scenario: Scenario::MultiTicker,
            patterns: vec![COMPARATIVE_RE.clone()],
        },
        ScenarioMatcher::new(
            Scenario::Intraday,
            &[
                r"\bcurrent(?:ly)? (?:stock |share )?(?:price|trading|quote)\b",
                r"\bprice (?:right now|today|at the moment)\b",
                r"\btoday'?s? (?:price|open|close|high|low|move)\b",
            ],
            &[
                "right now", "real-time", "real time", "realtime", "intraday", "live price",
                "pre-market", "premarket", "after-hours", "after hours", "trading at",
                "at the open", "this morning",
            ],
        ),
        ScenarioMatcher::new(
            Scenario::Crypto,
            &[],
            &[
                "bitcoin", "btc", "ethereum", "eth", "crypto", "cryptocurrency",
                "cryptocurrencies", "solana", "dogecoin", "stablecoin", "altcoin", "defi",
                "blockchain", "xrp",
            ],
        ),
        ScenarioMatcher::new(
            Scenario::Regulatory,
            &[r"\b(?:10-k|10-q|8-k|s-1|13f)\b", r"\bcapital requirements?\b"],
            &[
                "sec", "filing", "filings", "regulation", "regulations", "regulatory",
                "compliance", "basel", "dodd-frank", "mifid", "finra", "fdic", "disclosure",
                "sanction", "sanctions",
            ],
        ),
        ScenarioMatcher::new(
            Scenario::PortfolioAdvice,
            &[r"\b\d{2}/\d{2} (?:portfolio|split)\b"],
            &[
                "portfolio", "allocation", "allocate", "diversify", "diversification",
                "rebalance", "rebalancing", "asset mix", "retirement account",
            ],
        ),
        ScenarioMatcher::new(
            Scenario::Advice,
            &[
                r"\bshould (?:i|we)\b",
                r"\bworth (?:investing|buying|holding)\b",
                r"\bgood (?:time|investment|buy)\b",
                r"\bwhat (?:stocks?|etfs?) (?:to|should) buy\b",
            ],
            &["recommend", "recommendation", "buy or sell", "invest in", "advice"],
        ),
        ScenarioMatcher::new(
            Scenario::NumericKpi,
            &[r"\bhow (?:much|many)\b", r"\bp/e\b"],
            &[
                "eps", "earnings per share", "revenue", "net income", "pe ratio", "margin",
                "margins", "dividend yield", "market cap", "market capitalization", "ebitda",
                "free cash flow", "gross profit", "operating income", "percentage",
            ],
        ),
        ScenarioMatcher::new(
            Scenario::Fundamentals,
            &[],
            &[
                "fundamentals", "fundamental", "balance sheet", "cash flow", "income statement",
                "debt", "leverage", "valuation", "moat", "competitive advantage",
                "business model", "book value", "intrinsic value",
            ],
        ),
        ScenarioMatcher::new(
            Scenario::Directional,
            &[
                r"\b(?:go|going|move|moving|head|heading|trend|trending) (?:up|down|higher|lower)\b",
                r"\bup or down\b",
            ],
            &[
                "bullish", "bearish", "outlook", "forecast", "rally", "direction", "momentum",
                "rise", "fall", "decline",
            ],
        ),
        ScenarioMatcher::new(
            Scenario::News,
            &[r"\bannounce(?:d|ment|s)?\b"],
            &["news", "headline", "headlines", "latest", "press release", "reported", "report"],
        ),
    ]
});

/// Total, pure question → scenario classifier.
#[derive(Debug, Clone, Default)]
pub struct ScenarioClassifier {
    table: ScenarioTable,
}

impl ScenarioClassifier {
    pub fn new(table: ScenarioTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &ScenarioTable {
        &self.table
    }

    /// Auto-detect a scenario, returning the matched fragment.
    pub fn detect<'q>(&self, question: &'q str) -> (Scenario, Option<&'q str>) {
        MATCHERS
            .iter()
            .find_map(|m| m.find(question).map(|hit| (m.scenario, Some(hit))))
            .unwrap_or((Scenario::Default, None))
    }

    /// Classify a question, honouring a valid manual override.
    pub fn classify(&self, question: &str, manual_override: Option<&str>) -> Classification {
        let mut warnings = Vec::new();

        if let Some(raw) = manual_override {
            match raw.parse::<Scenario>() {
                Ok(scenario) => {
                    return Classification {
                        scenario,
                        profile: *self.table.get(scenario),
                        source: ScenarioSource::Override,
                        matched: None,
                        warnings,
                    };
                }
                Err(_) => {
                    log::warn!("Unknown scenario override '{raw}', falling back to detection");
                    warnings.push(format!(
                        "unknown scenario override '{raw}': auto-detected instead"
                    ));
                }
            }
        }

        let (scenario, matched) = self.detect(question);
        let source = if matched.is_some() {
            ScenarioSource::Detected
        } else {
            ScenarioSource::Fallback
        };
        log::debug!("Scenario {scenario} ({source:?}) for question {question:?}");

        Classification {
            scenario,
            profile: *self.table.get(scenario),
            source,
            matched: matched.map(str::to_string),
            warnings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detect(q: &str) -> Scenario {
        ScenarioClassifier::default().detect(q).0
    }

    #[test]
    fn test_detects_each_scenario() {
        assert_eq!(detect("Compare AAPL vs MSFT"), Scenario::MultiTicker);
        assert_eq!(detect("What is the current price of TSLA?"), Scenario::Intraday);
        assert_eq!(detect("Where is bitcoin heading?"), Scenario::Crypto);
        assert_eq!(detect("What did Apple disclose in its latest 10-K?"), Scenario::Regulatory);
        assert_eq!(detect("How should I rebalance my portfolio?"), Scenario::PortfolioAdvice);
        assert_eq!(detect("Should I buy Nvidia?"), Scenario::Advice);
        assert_eq!(detect("What was Microsoft's revenue last quarter?"), Scenario::NumericKpi);
        assert_eq!(detect("Is Ford's balance sheet healthy?"), Scenario::Fundamentals);
        assert_eq!(detect("Is the S&P 500 going up or down?"), Scenario::Directional);
        assert_eq!(detect("Any news on Boeing?"), Scenario::News);
    }

    #[test]
    fn test_default_is_total() {
        assert_eq!(detect("Tell me a joke"), Scenario::Default);
        assert_eq!(detect(""), Scenario::Default);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(detect("WHAT IS THE DIVIDEND YIELD OF KO"), Scenario::NumericKpi);
    }

    #[test]
    fn test_priority_order() {
        // Comparison beats the intraday cue.
        assert_eq!(detect("Compare the current price of AAPL and MSFT"), Scenario::MultiTicker);
        // Live quote beats crypto.
        assert_eq!(detect("What is bitcoin trading at right now?"), Scenario::Intraday);
    }

    #[test]
    fn test_keyword_word_boundaries() {
        // "eth" inside "method" must not trigger crypto.
        assert_eq!(detect("Explain the method"), Scenario::Default);
    }

    #[test]
    fn test_valid_override_wins() {
        let c = ScenarioClassifier::default().classify("Compare AAPL vs MSFT", Some("news"));
        assert_eq!(c.scenario, Scenario::News);
        assert_eq!(c.source, ScenarioSource::Override);
        assert_eq!(c.profile.threshold, ScenarioProfile::builtin(Scenario::News).threshold);
        assert!(c.warnings.is_empty());
    }

    #[test]
    fn test_unknown_override_falls_back() {
        let c = ScenarioClassifier::default().classify("Compare AAPL vs MSFT", Some("astrology"));
        assert_eq!(c.scenario, Scenario::MultiTicker);
        assert_eq!(c.source, ScenarioSource::Detected);
        assert_eq!(c.warnings.len(), 1);
        assert!(c.warnings[0].contains("astrology"));
    }

    #[test]
    fn test_custom_table_is_used() {
        let mut table = ScenarioTable::default();
        table.get_mut(Scenario::Default).threshold = 0.42;
        let c = ScenarioClassifier::new(table).classify("hello", None);
        assert_eq!(c.source, ScenarioSource::Fallback);
        assert_eq!(c.profile.threshold, 0.42);
    }
}
