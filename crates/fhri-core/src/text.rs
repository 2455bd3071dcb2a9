// ─────────────────────────────────────────────────────────────────────
// FHRI Reliability Kernel — Lightweight Text Analysis
// ─────────────────────────────────────────────────────────────────────
//! Surface-level text features used by the classifier and the
//! contradiction fusion: key terms, entities, comparative intent,
//! directional claims and signed percentage claims.
//!
//! These are cheap regex/lexicon heuristics. They never
//! decide a label on their own; they only gate or adjust scores that
//! come from the model-backed signals.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[$]?[A-Za-z][A-Za-z0-9'&.-]*").unwrap());

static CLAUSE_SPLIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i);|,\s|\.(?:\s|$)|\b(?:while|whereas|but|and|however)\b").unwrap()
});

/// Comparison/contrast phrasing in a question.
pub(crate) static COMPARATIVE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:compare[sd]?|comparing|comparison|versus|vs\.?|difference between|relative to|(?:better|worse|stronger|weaker|cheaper) than|which (?:one |stock |company )?(?:is |was )?(?:better|stronger|cheaper|safer)|outperform(?:s|ed|ing)?|underperform(?:s|ed|ing)?)(?:\s|$|[?,.])",
    )
    .unwrap()
});

static UP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:up|rose|risen|rise|rises|rising|gain(?:s|ed)?|increas(?:e|es|ed|ing)|gr(?:ew|own|ow|ows|owing)|climb(?:s|ed)?|jump(?:s|ed)?|surg(?:e|es|ed)|higher|rall(?:y|ied|ies)|advanc(?:e|es|ed)|soar(?:s|ed)?|expand(?:s|ed)?)\b",
    )
    .unwrap()
});

static DOWN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:down|fell|fallen|fall|falls|drop(?:s|ped)?|declin(?:e|es|ed|ing)|decreas(?:e|es|ed|ing)|shr(?:ank|unk|ink|inks)|lost|los(?:e|es)|slid|slide|slides|plung(?:e|es|ed)|lower|contract(?:s|ed)?|tumbl(?:e|es|ed)|sank|sink|sinks)\b",
    )
    .unwrap()
});

/// A percentage, optionally preceded by a direction verb: `grew 2%`,
/// `fell by 3.5 percent`, `-1.2%`.
static PERCENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(?:\b(?P<verb>[a-z]+)\s+(?:by\s+|to\s+)?(?:about\s+|roughly\s+|approximately\s+|nearly\s+|around\s+)?)?(?P<num>[+-]?\d+(?:\.\d+)?)\s*(?:%|percent\b|pct\b)",
    )
    .unwrap()
});

const STOPWORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "all", "also", "am", "an", "and", "any", "are", "as",
    "at", "be", "been", "before", "being", "below", "between", "both", "but", "by", "can", "could",
    "did", "do", "does", "doing", "down", "during", "each", "few", "for", "from", "further", "had",
    "has", "have", "having", "he", "her", "here", "hers", "him", "his", "how", "i", "if", "in",
    "into", "is", "it", "its", "it's", "just", "me", "more", "most", "my", "no", "nor", "not",
    "now", "of", "off", "on", "once", "only", "or", "other", "our", "out", "over", "own", "same",
    "she", "should", "so", "some", "such", "than", "that", "the", "their", "them", "then", "there",
    "these", "they", "this", "those", "through", "to", "too", "under", "until", "up", "very",
    "was", "we", "were", "what", "what's", "when", "where", "which", "while", "who", "whom", "why",
    "will", "with", "would", "you", "your", "tell", "show", "give", "please", "know", "think",
    "compare", "versus", "better", "worse", "today", "current", "currently", "latest", "now",
    "stock", "stocks", "share", "shares", "price", "prices", "market", "company", "companies",
];

fn is_stopword(word: &str) -> bool {
    STOPWORDS.contains(&word)
}

fn normalize(word: &str) -> String {
    word.trim_start_matches('$')
        .trim_end_matches(['.', '-', '\''])
        .trim_end_matches("'s")
        .to_lowercase()
}

/// Lowercased word tokens, possessives and `$` prefixes stripped.
pub fn words(text: &str) -> Vec<String> {
    WORD_RE
        .find_iter(text)
        .map(|m| normalize(m.as_str()))
        .filter(|w| !w.is_empty())
        .collect()
}

/// Named entities: tickers/acronyms (`AAPL`, `$TSLA`, `GDP`) and
/// capitalized names that are not stopwords. Lowercased.
pub fn entities(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    for m in WORD_RE.find_iter(text) {
        let raw = m.as_str();
        let core = raw
            .trim_start_matches('$')
            .trim_end_matches(['.', '-', '\''])
            .trim_end_matches("'s");
        let Some(first) = core.chars().next() else {
            continue;
        };
        let letters: Vec<char> = core.chars().filter(|c| c.is_alphabetic()).collect();
        let is_ticker = raw.starts_with('$')
            || (letters.len() >= 2 && letters.len() <= 5 && letters.iter().all(|c| c.is_uppercase()));
        let is_name = first.is_uppercase() && !is_stopword(&core.to_lowercase());
        if is_ticker || is_name {
            let key = core.to_lowercase();
            if !out.contains(&key) {
                out.push(key);
            }
        }
    }
    out
}

/// Entities plus content words (length >= 4, not stopwords).
pub fn key_terms(text: &str) -> HashSet<String> {
    let mut terms: HashSet<String> = entities(text).into_iter().collect();
    for w in words(text) {
        if w.len() >= 4 && !is_stopword(&w) {
            terms.insert(w);
        }
    }
    terms
}

/// Whether two texts share at least one entity or content term.
pub fn shares_terms(a: &str, b: &str) -> bool {
    let ta = key_terms(a);
    let tb = key_terms(b);
    ta.intersection(&tb).next().is_some()
}

/// Whether a question asks to compare or contrast entities.
pub fn has_comparative_intent(question: &str) -> bool {
    COMPARATIVE_RE.is_match(question)
}

/// Direction of a claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// "X went up/down", optionally attributed to an entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectionalClaim {
    pub entity: Option<String>,
    pub direction: Direction,
}

/// A signed percentage claim. `value` is negative for declines.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericClaim {
    pub entity: Option<String>,
    pub value: f64,
}

fn clauses(text: &str) -> impl Iterator<Item = &str> {
    CLAUSE_SPLIT_RE
        .split(text)
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

fn verb_direction(word: &str) -> Option<Direction> {
    if UP_RE.is_match(word) {
        Some(Direction::Up)
    } else if DOWN_RE.is_match(word) {
        Some(Direction::Down)
    } else {
        None
    }
}

fn clause_direction(clause: &str) -> Option<Direction> {
    match (UP_RE.is_match(clause), DOWN_RE.is_match(clause)) {
        (true, false) => Some(Direction::Up),
        (false, true) => Some(Direction::Down),
        _ => None,
    }
}

/// One directional claim per clause that states an unambiguous direction.
pub fn directional_claims(text: &str) -> Vec<DirectionalClaim> {
    clauses(text)
        .filter_map(|clause| {
            let direction = clause_direction(clause).or_else(|| {
                numeric_claims_in_clause(clause, None)
                    .first()
                    .filter(|c| c.value != 0.0)
                    .map(|c| if c.value < 0.0 { Direction::Down } else { Direction::Up })
            })?;
            Some(DirectionalClaim {
                entity: entities(clause).into_iter().next(),
                direction,
            })
        })
        .collect()
}

/// True when the claims move in opposite directions for *different*
/// entities and no single entity is claimed to move both ways.
pub fn is_clean_directional_split(claims: &[DirectionalClaim]) -> bool {
    let attributed: Vec<(&str, Direction)> = claims
        .iter()
        .filter_map(|c| c.entity.as_deref().map(|e| (e, c.direction)))
        .collect();

    let self_conflict = attributed.iter().any(|(e, d)| {
        attributed
            .iter()
            .any(|(e2, d2)| e == e2 && *d2 == d.opposite())
    });
    if self_conflict {
        return false;
    }

    attributed.iter().any(|(e, d)| {
        attributed
            .iter()
            .any(|(e2, d2)| e != e2 && *d2 == d.opposite())
    })
}

fn numeric_claims_in_clause(clause: &str, entity: Option<&str>) -> Vec<NumericClaim> {
    let fallback = clause_direction(clause);
    PERCENT_RE
        .captures_iter(clause)
        .filter_map(|caps| {
            let num = caps.name("num")?.as_str();
            let magnitude: f64 = num.parse().ok()?;
            let explicit_sign = num.starts_with('+') || num.starts_with('-');
            let direction = caps
                .name("verb")
                .and_then(|v| verb_direction(v.as_str()))
                .or(fallback);
            let value = match (explicit_sign, direction) {
                (true, _) => magnitude,
                (false, Some(Direction::Down)) => -magnitude,
                (false, _) => magnitude,
            };
            Some(NumericClaim {
                entity: entity.map(str::to_string),
                value,
            })
        })
        .collect()
}

/// Signed percentage claims, attributed to the first entity in the
/// clause where they appear.
pub fn numeric_claims(text: &str) -> Vec<NumericClaim> {
    numeric_claims_about(text, None)
}

/// Like [`numeric_claims`], but a clause naming no entity ("It rose 5%")
/// is attributed to `subject` instead of left unattributed.
pub fn numeric_claims_about(text: &str, subject: Option<&str>) -> Vec<NumericClaim> {
    clauses(text)
        .flat_map(|clause| {
            let entity = entities(clause).into_iter().next();
            numeric_claims_in_clause(clause, entity.as_deref().or(subject))
        })
        .collect()
}

/// The one entity a question is about, if it names exactly one.
pub fn sole_entity(question: &str) -> Option<String> {
    let mut found = entities(question);
    if found.len() == 1 {
        found.pop()
    } else {
        None
    }
}

/// Relative difference `|a - b| / max(|a|, |b|)`, 0 when both are 0.
pub fn relative_difference(a: f64, b: f64) -> f64 {
    let scale = a.abs().max(b.abs());
    if scale == 0.0 {
        0.0
    } else {
        (a - b).abs() / scale
    }
}

/// Whether any pair of claims about the same subject disagrees in sign
/// or differs in magnitude by more than `tolerance` (relative).
///
/// Claims pair when their entities match or either is unattributed.
pub fn numeric_conflict(prev: &[NumericClaim], curr: &[NumericClaim], tolerance: f64) -> bool {
    numeric_conflict_outside(prev, curr, tolerance, &[])
}

/// [`numeric_conflict`] where an unattributed claim never pairs with a
/// claim about one of the `split` entities. Used when a comparison has
/// already assigned opposite directions to those entities.
pub fn numeric_conflict_outside(
    prev: &[NumericClaim],
    curr: &[NumericClaim],
    tolerance: f64,
    split: &[String],
) -> bool {
    prev.iter().any(|p| {
        curr.iter().any(|c| {
            let same_subject = match (&p.entity, &c.entity) {
                (Some(a), Some(b)) => a == b,
                (None, Some(e)) | (Some(e), None) => !split.contains(e),
                (None, None) => true,
            };
            if !same_subject {
                return false;
            }
            let sign_flip = p.value * c.value < 0.0;
            sign_flip || relative_difference(p.value, c.value) > tolerance
        })
    })
}
