//! Structured-lyrics parsing.
//!
//! Generation output uses bracketed section headers:
//!
//! ```text
//! [Intro]
//! ...lines...
//! [Verse 1]
//! ...
//! ```
//!
//! The parser is lenient about casing and surrounding whitespace but never
//! invents sections: text before the first header is dropped with a record
//! in the parse result, so the validator sees exactly what the provider
//! produced.

use serde::{Deserialize, Serialize};

/// The nine structural sections, in their required order. Labels containing
/// "chorus" are chorus-type for the honored-name placement rule.
pub const SECTION_ORDER: [&str; 9] = [
    "intro",
    "verse 1",
    "chorus",
    "verse 2",
    "chorus 2",
    "bridge",
    "verse 3",
    "final chorus",
    "outro",
];

pub fn is_chorus_label(label: &str) -> bool {
    label.to_lowercase().contains("chorus")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    /// Normalized lowercase label, e.g. `verse 1`.
    pub label: String,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedLyrics {
    pub sections: Vec<Section>,
    /// Text preceding the first header, if any (usually provider preamble).
    pub preamble: Option<String>,
}

impl ParsedLyrics {
    pub fn section(&self, label: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.label == label)
    }

    pub fn chorus_text(&self) -> String {
        self.sections
            .iter()
            .filter(|s| is_chorus_label(&s.label))
            .map(|s| s.body.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn non_chorus_text(&self) -> String {
        self.sections
            .iter()
            .filter(|s| !is_chorus_label(&s.label))
            .map(|s| s.body.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn full_text(&self) -> String {
        self.sections
            .iter()
            .map(|s| s.body.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_sections_json(&self) -> serde_json::Value {
        serde_json::json!(self.sections)
    }
}

/// Parse bracketed-header lyrics into sections.
pub fn parse_lyrics(text: &str) -> ParsedLyrics {
    let mut sections: Vec<Section> = Vec::new();
    let mut preamble_lines: Vec<&str> = Vec::new();
    let mut current: Option<(String, Vec<&str>)> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(label) = header_label(trimmed) {
            if let Some((done_label, body)) = current.take() {
                sections.push(Section {
                    label: done_label,
                    body: body.join("\n").trim().to_string(),
                });
            }
            current = Some((label, Vec::new()));
        } else {
            match &mut current {
                Some((_, body)) => body.push(line),
                None => preamble_lines.push(line),
            }
        }
    }
    if let Some((label, body)) = current {
        sections.push(Section {
            label,
            body: body.join("\n").trim().to_string(),
        });
    }

    let preamble = {
        let joined = preamble_lines.join("\n").trim().to_string();
        if joined.is_empty() {
            None
        } else {
            Some(joined)
        }
    };

    ParsedLyrics { sections, preamble }
}

fn header_label(line: &str) -> Option<String> {
    let inner = line.strip_prefix('[')?.strip_suffix(']')?;
    let label = inner.trim().to_lowercase();
    if label.is_empty() {
        None
    } else {
        Some(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> &'static str {
        "[Intro]\nSoft piano\n[Verse 1]\nWe remember the rain\n[Chorus]\nMaria, this is for you\n"
    }

    #[test]
    fn parses_headers_and_bodies() {
        let parsed = parse_lyrics(sample());
        assert_eq!(parsed.sections.len(), 3);
        assert_eq!(parsed.sections[0].label, "intro");
        assert_eq!(parsed.sections[1].body, "We remember the rain");
        assert!(parsed.preamble.is_none());
    }

    #[test]
    fn preamble_is_captured_not_discarded_silently() {
        let parsed = parse_lyrics("Here are your lyrics:\n[Intro]\nhum\n");
        assert_eq!(parsed.preamble.as_deref(), Some("Here are your lyrics:"));
        assert_eq!(parsed.sections.len(), 1);
    }

    #[test]
    fn labels_normalize_case_and_whitespace() {
        let parsed = parse_lyrics("[ FINAL CHORUS ]\nsing it\n");
        assert_eq!(parsed.sections[0].label, "final chorus");
    }

    #[test]
    fn chorus_text_collects_all_chorus_type_sections() {
        let parsed =
            parse_lyrics("[Chorus]\nfirst\n[Bridge]\nmiddle\n[Final Chorus]\nlast\n");
        assert_eq!(parsed.chorus_text(), "first\nlast");
        assert_eq!(parsed.non_chorus_text(), "middle");
    }
}
