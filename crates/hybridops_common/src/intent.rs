//! Intent Parser - free text to (tool, params)
//!
//! Matching is substring-based over an ordered trigger table. The first tool
//! whose trigger occurs in the normalized text wins, so table order is the
//! tie-break: list tools, then single-entity tools, then mutating tools.

use crate::i18n;
use crate::lang::{detect_language, normalize_text};
use crate::protocol::ToolParams;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Title used when a create request carries no usable title
pub const DEFAULT_JOB_TITLE: &str = "Neuer Job";

/// Trigger phrases per tool, languages pooled, in match order
const TOOL_PATTERNS: &[(&str, &[&str])] = &[
    (
        "jobs.list",
        &[
            "liste jobs", "liste alle jobs", "zeige jobs", "zeig jobs",
            "jobs anzeigen", "welche jobs gibt es", "welche jobs",
            "alle jobs", "jobs liste", "zeige alle jobs",
            "list jobs", "show jobs", "show all jobs", "all jobs",
            "prikaži poslove", "lista poslova", "svi poslovi",
        ],
    ),
    (
        "jobs.get",
        &[
            "job details", "zeige job", "job anzeigen", "details job",
            "show job", "job info", "get job",
            "detalji posla", "prikaži posao",
        ],
    ),
    (
        "jobs.create",
        &[
            "erstelle job", "neuer job", "job erstellen", "neuen job",
            "create job", "new job", "add job",
            "kreiraj posao", "napravi posao", "novi posao",
        ],
    ),
    (
        "jobs.approve",
        &[
            "genehmige job", "bestätige job", "job genehmigen", "approve job",
            "odobri posao",
        ],
    ),
    (
        "jobs.reject",
        &[
            "ablehnen job", "job ablehnen", "verweigere job", "reject job",
            "odbij posao",
        ],
    ),
    (
        "jobs.update",
        &[
            "aktualisiere job", "job aktualisieren", "update job", "edit job",
            "ažuriraj posao",
        ],
    ),
];

/// Outcome of parsing. Exactly one of `tool` / `suggestions` is populated.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedIntent {
    /// Empty when nothing matched
    pub tool: String,
    pub params: ToolParams,
    pub suggestions: Vec<String>,
}

impl ParsedIntent {
    pub fn is_unclear(&self) -> bool {
        self.tool.is_empty()
    }
}

fn uuid_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([a-f0-9]{8}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{4}-[a-f0-9]{12})")
            .expect("static regex")
    })
}

fn loose_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"id[:\s]*([a-zA-Z0-9\-]+)").expect("static regex"))
}

fn quoted_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"["']([^"']+)["']"#).expect("static regex"))
}

fn after_job_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:job|posao)[:\s]+(.+)").expect("static regex"))
}

/// First UUID-shaped token in the original text
fn find_uuid(text: &str) -> Option<String> {
    uuid_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// Capitalize the first letter of every alphabetic run, lowercase the rest
pub fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if in_word {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(ch);
            in_word = false;
        }
    }
    out
}

fn extract_title(original: &str, normalized: &str) -> String {
    let raw = first_capture(quoted_re(), original)
        .or_else(|| first_capture(after_job_word_re(), normalized));

    match raw.map(|t| t.trim().to_string()) {
        Some(title) if !title.is_empty() => title_case(&title),
        _ => DEFAULT_JOB_TITLE.to_string(),
    }
}

fn extract_params(tool: &str, original: &str, normalized: &str) -> ToolParams {
    let mut params = ToolParams::new();

    match tool {
        "jobs.get" => {
            let id = find_uuid(original).or_else(|| first_capture(loose_id_re(), normalized));
            if let Some(id) = id {
                params.insert("job_id".to_string(), Value::String(id));
            }
        }
        "jobs.create" => {
            params.insert(
                "title".to_string(),
                Value::String(extract_title(original, normalized)),
            );
        }
        "jobs.approve" | "jobs.reject" | "jobs.update" => {
            // a missing id is left for execution to reject
            if let Some(id) = find_uuid(original) {
                params.insert("job_id".to_string(), Value::String(id));
            }
        }
        _ => {}
    }

    params
}

/// Map free text to a tool and its parameters, or to localized suggestions.
/// Total: never fails.
pub fn parse_intent(text: &str) -> ParsedIntent {
    let normalized = normalize_text(text);

    for (tool, patterns) in TOOL_PATTERNS {
        if patterns.iter().any(|p| normalized.contains(p)) {
            return ParsedIntent {
                tool: tool.to_string(),
                params: extract_params(tool, text, &normalized),
                suggestions: Vec::new(),
            };
        }
    }

    ParsedIntent {
        tool: String::new(),
        params: ToolParams::new(),
        suggestions: i18n::suggestions(detect_language(text)),
    }
}
