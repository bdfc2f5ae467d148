// Presentation state for the form that does not depend on a terminal.

use serde::Serialize;

/// Inputs longer than this get a warning that the code will be dense.
pub const LONG_TEXT_THRESHOLD: usize = 1000;

const SUMMARY_LIMIT: usize = 50;

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub label: &'static str,
    pub hint: &'static str,
    pub value: &'static str,
}

pub const PRESETS: [Preset; 3] = [
    Preset {
        label: "Website URL",
        hint: "https://github.com",
        value: "https://github.com",
    },
    Preset {
        label: "Email Address",
        hint: "mailto:hello@example.com",
        value: "mailto:hello@example.com",
    },
    Preset {
        label: "Custom Message",
        hint: "Welcome message",
        value: "Welcome to our restaurant! Scan for our menu and special offers.",
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharCount(pub usize);

impl CharCount {
    pub fn of(text: &str) -> Self {
        CharCount(text.chars().count())
    }

    pub fn is_long(self) -> bool {
        self.0 > LONG_TEXT_THRESHOLD
    }

    pub fn hint(self) -> &'static str {
        if self.is_long() {
            "Long text may create complex QR codes"
        } else {
            "Optimal length"
        }
    }
}

/// One line describing what the code holds.
pub fn summary(text: &str) -> String {
    if text.is_empty() {
        return "Enter text above to generate your QR code".to_string();
    }

    let mut chars = text.chars();
    let head: String = chars.by_ref().take(SUMMARY_LIMIT).collect();
    if chars.next().is_some() {
        format!("QR code contains: \"{head}...\"")
    } else {
        format!("QR code contains: \"{head}\"")
    }
}
