//! Language detection for operator input.
//!
//! Keyword-substring scoring over a fixed language order. Each keyword
//! contributes at most one point no matter how often it occurs. Ties go to
//! the language enumerated first; all-zero input falls back to German.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// Response locales the supervisor speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    De,
    Bs,
    En,
}

impl Language {
    /// Detection order, also the tie-break order
    pub const ALL: [Language; 3] = [Language::De, Language::Bs, Language::En];

    /// Used when no keyword matches
    pub const FALLBACK: Language = Language::De;

    pub fn code(&self) -> &'static str {
        match self {
            Language::De => "de",
            Language::Bs => "bs",
            Language::En => "en",
        }
    }

    /// Parse a language code ("de", "BS", " en ")
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_lowercase().as_str() {
            "de" => Some(Language::De),
            "bs" => Some(Language::Bs),
            "en" => Some(Language::En),
            _ => None,
        }
    }

    fn keywords(&self) -> &'static [&'static str] {
        match self {
            Language::De => &[
                "liste", "zeige", "zeig", "erstelle", "neu", "genehmige", "ablehnen",
                "bestätige", "hilfe", "was", "wie", "job", "jobs", "alle", "anzeigen",
                "welche", "gibt", "bitte", "danke", "details", "status", "aktualisiere",
            ],
            Language::Bs => &[
                "prikaži", "napravi", "odobri", "odbij", "pomoc", "šta", "kako",
                "posao", "poslovi", "lista", "detalji", "kreiraj", "svi", "molim",
            ],
            Language::En => &[
                "list", "show", "create", "approve", "reject", "help", "what", "how",
                "job", "jobs", "all", "please", "details", "status", "update", "new",
            ],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

fn trailing_punct() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+$").expect("static regex"))
}

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

/// Lowercase, trim, drop trailing sentence punctuation, collapse whitespace
pub fn normalize_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let trimmed = lowered.trim();
    let stripped = trailing_punct().replace(trimmed, "");
    whitespace_run().replace_all(&stripped, " ").into_owned()
}

/// Score of one language against already-normalized text
fn score(lang: Language, normalized: &str) -> usize {
    lang.keywords()
        .iter()
        .filter(|kw| normalized.contains(*kw))
        .count()
}

/// Detect the response language for free text
pub fn detect_language(text: &str) -> Language {
    let normalized = normalize_text(text);

    let mut best = Language::FALLBACK;
    let mut best_score = 0;
    for lang in Language::ALL {
        let s = score(lang, &normalized);
        // strict > keeps the first-enumerated language on ties
        if s > best_score {
            best = lang;
            best_score = s;
        }
    }

    best
}
