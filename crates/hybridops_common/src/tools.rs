//! Tool Registry - static catalog of invocable tools
//!
//! Every tool either service knows about lives here, tagged READ, WRITE or
//! TEST, with its accepted parameters and the single downstream API call it
//! maps to. The catalog is immutable for the lifetime of the process.

use crate::lang::Language;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Tool classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ToolKind {
    /// Read-only
    Read,
    /// Mutates job state
    Write,
    /// Exists for test harnesses only
    Test,
}

impl ToolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolKind::Read => "READ",
            ToolKind::Write => "WRITE",
            ToolKind::Test => "TEST",
        }
    }

    /// WRITE and TEST tools go through the tool gate's confirm handshake
    pub fn requires_confirmation(&self) -> bool {
        !matches!(self, ToolKind::Read)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// HTTP method of the downstream call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
        }
    }
}

/// Static description of one tool
#[derive(Debug)]
pub struct ToolDescriptor {
    /// Dotted name, e.g. "jobs.approve"
    pub name: &'static str,
    pub kind: ToolKind,
    /// Descriptions in de, bs, en order
    descriptions: [&'static str; 3],
    pub accepted_params: &'static [&'static str],
    /// Subset of accepted_params the call cannot be made without
    pub required_params: &'static [&'static str],
    pub method: HttpMethod,
    /// Path with `{param}` placeholders
    pub path_template: &'static str,
}

impl ToolDescriptor {
    pub fn description(&self, lang: Language) -> &'static str {
        match lang {
            Language::De => self.descriptions[0],
            Language::Bs => self.descriptions[1],
            Language::En => self.descriptions[2],
        }
    }

    /// Upper-cased last segment, used in "EXECUTE <ACTION>"
    pub fn action_name(&self) -> String {
        action_name(self.name)
    }

    /// Wire form used by the tools-list endpoint
    pub fn info(&self) -> ToolInfo {
        ToolInfo {
            description: self.description(Language::En).to_string(),
            kind: self.kind,
            params: self.accepted_params.iter().map(|p| p.to_string()).collect(),
        }
    }
}

/// Serializable descriptor: `{"description", "type", "params"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolInfo {
    pub description: String,
    #[serde(rename = "type")]
    pub kind: ToolKind,
    pub params: Vec<String>,
}

const REGISTRY: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "jobs.list",
        kind: ToolKind::Read,
        descriptions: ["Alle Jobs auflisten", "Prikaži sve poslove", "List all jobs"],
        accepted_params: &[],
        required_params: &[],
        method: HttpMethod::Get,
        path_template: "/jobs",
    },
    ToolDescriptor {
        name: "jobs.get",
        kind: ToolKind::Read,
        descriptions: ["Job-Details anzeigen", "Prikaži detalje posla", "Show job details"],
        accepted_params: &["job_id"],
        required_params: &["job_id"],
        method: HttpMethod::Get,
        path_template: "/jobs/{job_id}",
    },
    ToolDescriptor {
        name: "jobs.create",
        kind: ToolKind::Write,
        descriptions: ["Neuen Job erstellen", "Kreiraj novi posao", "Create a new job"],
        accepted_params: &["title", "payload"],
        required_params: &[],
        method: HttpMethod::Post,
        path_template: "/jobs",
    },
    ToolDescriptor {
        name: "jobs.update",
        kind: ToolKind::Write,
        descriptions: ["Job aktualisieren", "Ažuriraj posao", "Update job"],
        accepted_params: &["job_id", "title", "payload"],
        required_params: &["job_id"],
        method: HttpMethod::Patch,
        path_template: "/jobs/{job_id}",
    },
    ToolDescriptor {
        name: "jobs.set_needs_approval",
        kind: ToolKind::Test,
        descriptions: [
            "Job auf needs_approval setzen (nur Test)",
            "Postavi posao na needs_approval (samo test)",
            "Set job status to needs_approval (test only)",
        ],
        accepted_params: &["job_id"],
        required_params: &["job_id"],
        method: HttpMethod::Post,
        path_template: "/jobs/{job_id}/set-needs-approval",
    },
    ToolDescriptor {
        name: "jobs.approve",
        kind: ToolKind::Write,
        descriptions: ["Job genehmigen", "Odobri posao", "Approve job"],
        accepted_params: &["job_id"],
        required_params: &["job_id"],
        method: HttpMethod::Post,
        path_template: "/jobs/{job_id}/approve",
    },
    ToolDescriptor {
        name: "jobs.reject",
        kind: ToolKind::Write,
        descriptions: ["Job ablehnen", "Odbij posao", "Reject job"],
        accepted_params: &["job_id"],
        required_params: &["job_id"],
        method: HttpMethod::Post,
        path_template: "/jobs/{job_id}/reject",
    },
    ToolDescriptor {
        name: "slack.simulate_mention",
        kind: ToolKind::Test,
        descriptions: [
            "Slack-Erwähnung simulieren (lokaler Test)",
            "Simuliraj Slack spominjanje (lokalni test)",
            "Simulate a Slack mention event (local testing)",
        ],
        accepted_params: &["text", "user", "channel"],
        required_params: &[],
        method: HttpMethod::Post,
        path_template: "/integrations/slack/events",
    },
];

/// Find a tool by its dotted name
pub fn lookup(name: &str) -> Option<&'static ToolDescriptor> {
    REGISTRY.iter().find(|t| t.name == name)
}

/// All tools in catalog order
pub fn all() -> &'static [ToolDescriptor] {
    REGISTRY
}

/// Registry as `{name -> descriptor}` for the tools-list endpoint
pub fn catalog() -> BTreeMap<String, ToolInfo> {
    REGISTRY
        .iter()
        .map(|t| (t.name.to_string(), t.info()))
        .collect()
}

/// "jobs.approve" -> "APPROVE"
pub fn action_name(tool: &str) -> String {
    tool.rsplit('.').next().unwrap_or(tool).to_uppercase()
}
