//! Localized response strings for the supervisor.

use crate::lang::Language;
use crate::tools::ToolKind;

/// Message table for one language
#[derive(Debug)]
pub struct Translations {
    pub understood: &'static str,
    pub plan: &'static str,
    pub tools: &'static str,
    pub confirm_question: &'static str,
    /// Contains an `{action}` placeholder
    pub execute_instruction: &'static str,
    pub success: &'static str,
    pub error: &'static str,
    pub unclear: &'static str,
    pub suggestions_prefix: &'static str,
    pub parameters: &'static str,
    pub type_label: &'static str,
    pub type_read: &'static str,
    pub type_write: &'static str,
    pub type_test: &'static str,
}

const DE: Translations = Translations {
    understood: "Verstanden",
    plan: "Plan",
    tools: "Tools",
    confirm_question: "Soll ich fortfahren?",
    execute_instruction: "Schreibe: EXECUTE {action}",
    success: "Erfolgreich ausgeführt",
    error: "Fehler",
    unclear: "Ich habe nicht verstanden was du möchtest.",
    suggestions_prefix: "Versuche z.B.:",
    parameters: "Parameter",
    type_label: "Typ",
    type_read: "LESEN",
    type_write: "SCHREIBEN",
    type_test: "TEST",
};

const BS: Translations = Translations {
    understood: "Razumijem",
    plan: "Plan",
    tools: "Alati",
    confirm_question: "Da li da nastavim?",
    execute_instruction: "Napiši: EXECUTE {action}",
    success: "Uspješno izvršeno",
    error: "Greška",
    unclear: "Nisam razumio šta želiš.",
    suggestions_prefix: "Pokušaj npr.:",
    parameters: "Parametri",
    type_label: "Tip",
    type_read: "ČITANJE",
    type_write: "PISANJE",
    type_test: "TEST",
};

const EN: Translations = Translations {
    understood: "Understood",
    plan: "Plan",
    tools: "Tools",
    confirm_question: "Should I proceed?",
    execute_instruction: "Type: EXECUTE {action}",
    success: "Successfully executed",
    error: "Error",
    unclear: "I didn't understand what you want.",
    suggestions_prefix: "Try e.g.:",
    parameters: "Parameters",
    type_label: "Type",
    type_read: "READ",
    type_write: "WRITE",
    type_test: "TEST",
};

impl Translations {
    pub fn for_language(lang: Language) -> &'static Translations {
        match lang {
            Language::De => &DE,
            Language::Bs => &BS,
            Language::En => &EN,
        }
    }

    /// "Type: EXECUTE LIST" style instruction for an action name
    pub fn execute_instruction_for(&self, action: &str) -> String {
        self.execute_instruction.replace("{action}", action)
    }

    pub fn kind_label(&self, kind: ToolKind) -> &'static str {
        match kind {
            ToolKind::Read => self.type_read,
            ToolKind::Write => self.type_write,
            ToolKind::Test => self.type_test,
        }
    }

    /// Unclear-intent message followed by a bulleted suggestion list
    pub fn unclear_with_suggestions(&self, suggestions: &[String]) -> String {
        if suggestions.is_empty() {
            return self.unclear.to_string();
        }
        let bullets: Vec<String> = suggestions.iter().map(|s| format!("- {}", s)).collect();
        format!(
            "{}\n\n{}\n{}",
            self.unclear,
            self.suggestions_prefix,
            bullets.join("\n")
        )
    }
}

/// Three example phrases shown when intent is unclear
pub fn suggestions(lang: Language) -> Vec<String> {
    let items: [&str; 3] = match lang {
        Language::De => [
            "\"Liste alle Jobs\"",
            "\"Erstelle Job: <Titel>\"",
            "\"Genehmige Job <ID>\"",
        ],
        Language::Bs => [
            "\"Prikaži poslove\"",
            "\"Kreiraj posao: <Naslov>\"",
            "\"Odobri posao <ID>\"",
        ],
        Language::En => [
            "\"List jobs\"",
            "\"Create job: <Title>\"",
            "\"Approve job <ID>\"",
        ],
    };
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execute_instruction_substitution() {
        let t = Translations::for_language(Language::En);
        assert_eq!(t.execute_instruction_for("LIST"), "Type: EXECUTE LIST");
        let t = Translations::for_language(Language::De);
        assert_eq!(t.execute_instruction_for("APPROVE"), "Schreibe: EXECUTE APPROVE");
    }

    #[test]
    fn test_suggestions_per_language() {
        for lang in Language::ALL {
            assert_eq!(suggestions(lang).len(), 3);
        }
        assert_eq!(suggestions(Language::En)[0], "\"List jobs\"");
    }

    #[test]
    fn test_unclear_message_lists_suggestions() {
        let t = Translations::for_language(Language::En);
        let msg = t.unclear_with_suggestions(&suggestions(Language::En));
        assert!(msg.starts_with("I didn't understand"));
        assert!(msg.contains("Try e.g.:"));
        assert!(msg.contains("- \"Approve job <ID>\""));
    }

    #[test]
    fn test_kind_labels() {
        let t = Translations::for_language(Language::Bs);
        assert_eq!(t.kind_label(ToolKind::Read), "ČITANJE");
        assert_eq!(t.kind_label(ToolKind::Write), "PISANJE");
    }
}
