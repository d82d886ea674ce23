//! The deterministic rule set applied to every generation attempt.

use super::parser::{ParsedLyrics, SECTION_ORDER};
use crate::analysis::AddresseeNumber;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Filler and template leakage the product never ships.
const BANNED_TERMS: &[&str] = &[
    "la la la",
    "na na na",
    "yeah yeah yeah",
    "ooh ooh ooh",
    "[name]",
    "insert name",
    "placeholder",
    "lorem",
];

/// Informal terms allowed only when the brief itself uses them verbatim.
const INFORMAL_TERMS: &[&str] = &[
    "gonna", "wanna", "gotta", "ain't", "y'all", "bro", "dude", "yo", "nah", "gimme",
];

/// Third-person pronouns that must not refer to the honored subject; the
/// subject is addressed in second person throughout.
const THIRD_PERSON_PRONOUNS: &[&str] = &[
    "she", "she's", "he", "he's", "him", "his", "her", "hers",
];

/// Markers of collective address, required when the brief honors a group.
const COLLECTIVE_MARKERS: &[&str] = &[
    "you all",
    "all of you",
    "both of you",
    "you two",
    "together",
    "you're all",
];

/// One violated rule, rendered as `code` or `code:detail`
/// (e.g. `missing_section:bridge`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleViolation {
    pub code: String,
    pub detail: Option<String>,
}

impl RuleViolation {
    fn new(code: &str) -> Self {
        Self {
            code: code.to_string(),
            detail: None,
        }
    }

    fn with_detail(code: &str, detail: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            detail: Some(detail.into()),
        }
    }
}

impl fmt::Display for RuleViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}:{}", self.code, detail),
            None => write!(f, "{}", self.code),
        }
    }
}

/// Everything the validator needs, all precomputed and pure.
#[derive(Debug, Clone)]
pub struct ValidationInput<'a> {
    pub lyrics: &'a ParsedLyrics,
    /// Explicitly honored subject name(s), if the brief provided any.
    pub honored_names: &'a [String],
    /// Every proper name extracted from the brief.
    pub brief_names: &'a [String],
    pub addressee_number: AddresseeNumber,
    /// The brief's free text, lowercased, for the informal-term whitelist.
    pub brief_text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<RuleViolation>,
    pub warnings: Vec<String>,
    /// Which generation attempt produced the validated text (1-based); set
    /// by the orchestrator.
    pub attempt: u32,
}

impl ValidationReport {
    pub fn violation_count(&self) -> usize {
        self.errors.len()
    }

    /// The corrective instruction appended to the regeneration prompt:
    /// enumerates exactly the violated rules, nothing else changes between
    /// attempts.
    pub fn corrective_instruction(&self) -> String {
        let listed = self
            .errors
            .iter()
            .map(|e| format!("- {e}"))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "The previous lyrics violated these rules; fix every one of them \
             while keeping everything else unchanged:\n{listed}"
        )
    }
}

/// Apply rules a–h. Order of reported errors is stable: structural first,
/// then content rules in rule order.
pub fn validate_lyrics(input: &ValidationInput<'_>) -> ValidationReport {
    let mut errors: Vec<RuleViolation> = Vec::new();
    let mut warnings: Vec<String> = Vec::new();

    check_sections(input.lyrics, &mut errors, &mut warnings);
    check_banned_terms(input.lyrics, &mut errors);
    check_honored_name_placement(input, &mut errors);
    check_brief_names_present(input, &mut errors);
    check_second_person(input, &mut errors);
    check_comma_lists(input.lyrics, &mut errors);
    check_informal_terms(input, &mut errors);
    check_collective_address(input, &mut errors);

    ValidationReport {
        valid: errors.is_empty(),
        errors,
        warnings,
        attempt: 0,
    }
}

/// Rule a: the nine sections, present and in order.
fn check_sections(
    lyrics: &ParsedLyrics,
    errors: &mut Vec<RuleViolation>,
    warnings: &mut Vec<String>,
) {
    let labels: Vec<&str> = lyrics.sections.iter().map(|s| s.label.as_str()).collect();

    for required in SECTION_ORDER {
        if !labels.contains(&required) {
            // Scenario fixture convention: detail is the bare label with
            // spaces collapsed ("verse 1" reports as missing_section:verse_1)
            let detail = required.replace(' ', "_");
            errors.push(RuleViolation::with_detail("missing_section", detail));
        }
    }

    // Order check only meaningful over the sections that are present
    let expected_positions: Vec<usize> = labels
        .iter()
        .filter_map(|l| SECTION_ORDER.iter().position(|s| s == l))
        .collect();
    let mut sorted = expected_positions.clone();
    sorted.sort_unstable();
    if expected_positions != sorted {
        errors.push(RuleViolation::new("section_order"));
    }

    for section in &lyrics.sections {
        if section.body.trim().is_empty() {
            warnings.push(format!("empty section: {}", section.label));
        }
    }
}

/// Rule b.
fn check_banned_terms(lyrics: &ParsedLyrics, errors: &mut Vec<RuleViolation>) {
    let text = lyrics.full_text().to_lowercase();
    for term in BANNED_TERMS {
        if text.contains(term) {
            errors.push(RuleViolation::with_detail("banned_term", *term));
        }
    }
}

/// Rule c: honored names only in chorus-type sections, at least once there.
fn check_honored_name_placement(input: &ValidationInput<'_>, errors: &mut Vec<RuleViolation>) {
    if input.honored_names.is_empty() {
        return;
    }
    let chorus = input.lyrics.chorus_text().to_lowercase();
    let elsewhere = input.lyrics.non_chorus_text().to_lowercase();

    for name in input.honored_names {
        let needle = name.to_lowercase();
        if contains_word(&elsewhere, &needle) {
            errors.push(RuleViolation::with_detail(
                "honored_name_outside_chorus",
                name.clone(),
            ));
        }
        if !contains_word(&chorus, &needle) {
            errors.push(RuleViolation::with_detail(
                "honored_name_missing_from_chorus",
                name.clone(),
            ));
        }
    }
}

/// Rule d: every extracted brief name appears somewhere in the output.
fn check_brief_names_present(input: &ValidationInput<'_>, errors: &mut Vec<RuleViolation>) {
    let text = input.lyrics.full_text().to_lowercase();
    for name in input.brief_names {
        if !contains_word(&text, &name.to_lowercase()) {
            errors.push(RuleViolation::with_detail("missing_name", name.clone()));
        }
    }
}

/// Rule e: second-person addressing, no third-person pronouns for the
/// subject.
fn check_second_person(input: &ValidationInput<'_>, errors: &mut Vec<RuleViolation>) {
    let text = input.lyrics.full_text().to_lowercase();
    for pronoun in THIRD_PERSON_PRONOUNS {
        if contains_word(&text, pronoun) {
            errors.push(RuleViolation::with_detail("third_person_reference", *pronoun));
        }
    }
}

/// Rule f: a line of short comma-separated fragments is a word list, not a
/// lyric.
fn check_comma_lists(lyrics: &ParsedLyrics, errors: &mut Vec<RuleViolation>) {
    for section in &lyrics.sections {
        for line in section.body.lines() {
            let segments: Vec<&str> = line.split(',').map(str::trim).collect();
            if segments.len() >= 4
                && segments
                    .iter()
                    .all(|s| !s.is_empty() && s.split_whitespace().count() <= 2)
            {
                errors.push(RuleViolation::with_detail(
                    "comma_word_list",
                    section.label.clone(),
                ));
                break;
            }
        }
    }
}

/// Rule g: informal terms only when the brief used them verbatim.
fn check_informal_terms(input: &ValidationInput<'_>, errors: &mut Vec<RuleViolation>) {
    let text = input.lyrics.full_text().to_lowercase();
    let brief = input.brief_text.to_lowercase();
    for term in INFORMAL_TERMS {
        if contains_word(&text, term) && !contains_word(&brief, term) {
            errors.push(RuleViolation::with_detail("informal_term", *term));
        }
    }
}

/// Rule h: collective briefs must address the group collectively.
fn check_collective_address(input: &ValidationInput<'_>, errors: &mut Vec<RuleViolation>) {
    if input.addressee_number != AddresseeNumber::Collective {
        return;
    }
    let text = input.lyrics.full_text().to_lowercase();
    if !COLLECTIVE_MARKERS.iter().any(|m| text.contains(m)) {
        errors.push(RuleViolation::new("collective_address_missing"));
    }
}

/// Whole-word containment over lowercase text.
fn contains_word(text: &str, word: &str) -> bool {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .any(|w| w == word)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::parser::parse_lyrics;

    fn complete_lyrics(honored: &str) -> String {
        format!(
            "[Intro]\nA soft morning light\n\
             [Verse 1]\nWe walked along the harbor wall\n\
             [Chorus]\n{honored}, this song is for you\n\
             [Verse 2]\nThe years were kind to all of us\n\
             [Chorus 2]\n{honored}, we sing it louder now\n\
             [Bridge]\nEvery road led back to this door\n\
             [Verse 3]\nWe kept the photographs and the jokes\n\
             [Final Chorus]\n{honored}, this one will always be yours\n\
             [Outro]\nLet the last note linger\n"
        )
    }

    fn validate(text: &str, honored: &[&str], brief_names: &[&str], brief: &str) -> ValidationReport {
        let parsed = parse_lyrics(text);
        let honored: Vec<String> = honored.iter().map(|s| s.to_string()).collect();
        let brief_names: Vec<String> = brief_names.iter().map(|s| s.to_string()).collect();
        validate_lyrics(&ValidationInput {
            lyrics: &parsed,
            honored_names: &honored,
            brief_names: &brief_names,
            addressee_number: AddresseeNumber::Singular,
            brief_text: brief,
        })
    }

    #[test]
    fn complete_lyrics_pass() {
        let report = validate(&complete_lyrics("Maria"), &["Maria"], &["Maria"], "for Maria");
        assert!(report.valid, "unexpected errors: {:?}", report.errors);
    }

    #[test]
    fn missing_bridge_is_reported_by_name() {
        let text = complete_lyrics("Maria").replace("[Bridge]\nEvery road led back to this door\n", "");
        let report = validate(&text, &["Maria"], &["Maria"], "for Maria");
        assert!(!report.valid);
        assert!(report
            .errors
            .iter()
            .any(|e| e.to_string() == "missing_section:bridge"));
    }

    #[test]
    fn out_of_order_sections_are_flagged() {
        let text = "[Chorus]\nMaria you shine\n[Intro]\nhum\n[Verse 1]\nlines\n[Verse 2]\nlines\n\
                    [Chorus 2]\nMaria again\n[Bridge]\nlines\n[Verse 3]\nlines\n\
                    [Final Chorus]\nMaria once more\n[Outro]\nend";
        let report = validate(text, &["Maria"], &[], "for Maria");
        assert!(report.errors.iter().any(|e| e.code == "section_order"));
    }

    #[test]
    fn banned_terms_are_flagged() {
        let text = complete_lyrics("Maria").replace("A soft morning light", "la la la la");
        let report = validate(&text, &["Maria"], &["Maria"], "for Maria");
        assert!(report
            .errors
            .iter()
            .any(|e| e.to_string() == "banned_term:la la la"));
    }

    #[test]
    fn honored_name_in_verse_is_flagged() {
        let text =
            complete_lyrics("Maria").replace("We walked along the harbor wall", "Maria walked far");
        let report = validate(&text, &["Maria"], &["Maria"], "for Maria");
        assert!(report
            .errors
            .iter()
            .any(|e| e.to_string() == "honored_name_outside_chorus:Maria"));
    }

    #[test]
    fn honored_name_absent_from_chorus_is_flagged() {
        let text = complete_lyrics("friend");
        let report = validate(&text, &["Maria"], &[], "for Maria");
        assert!(report
            .errors
            .iter()
            .any(|e| e.to_string() == "honored_name_missing_from_chorus:Maria"));
    }

    #[test]
    fn missing_brief_name_is_flagged() {
        let report = validate(
            &complete_lyrics("Maria"),
            &["Maria"],
            &["Maria", "Lisbon"],
            "Maria in Lisbon",
        );
        assert!(report
            .errors
            .iter()
            .any(|e| e.to_string() == "missing_name:Lisbon"));
    }

    #[test]
    fn third_person_pronoun_is_flagged() {
        let text = complete_lyrics("Maria")
            .replace("The years were kind to all of us", "She always kept the faith");
        let report = validate(&text, &["Maria"], &["Maria"], "for Maria");
        assert!(report
            .errors
            .iter()
            .any(|e| e.to_string() == "third_person_reference:she"));
    }

    #[test]
    fn object_pronoun_and_contractions_are_flagged() {
        let with_her = complete_lyrics("Maria")
            .replace("The years were kind to all of us", "I told her everything that mattered");
        let report = validate(&with_her, &["Maria"], &["Maria"], "for Maria");
        assert!(report
            .errors
            .iter()
            .any(|e| e.to_string() == "third_person_reference:her"));

        let with_contraction = complete_lyrics("Maria")
            .replace("The years were kind to all of us", "She's always kept the faith");
        let report = validate(&with_contraction, &["Maria"], &["Maria"], "for Maria");
        assert!(report
            .errors
            .iter()
            .any(|e| e.to_string() == "third_person_reference:she's"));
    }

    #[test]
    fn comma_word_list_is_flagged() {
        let text = complete_lyrics("Maria")
            .replace("We kept the photographs and the jokes", "love, hope, joy, laughter");
        let report = validate(&text, &["Maria"], &["Maria"], "for Maria");
        assert!(report
            .errors
            .iter()
            .any(|e| e.to_string() == "comma_word_list:verse 3"));
    }

    #[test]
    fn informal_term_requires_brief_whitelist() {
        let text = complete_lyrics("Maria")
            .replace("The years were kind to all of us", "We're gonna dance tonight");

        let without_whitelist = validate(&text, &["Maria"], &["Maria"], "a song for Maria");
        assert!(without_whitelist
            .errors
            .iter()
            .any(|e| e.to_string() == "informal_term:gonna"));

        let with_whitelist =
            validate(&text, &["Maria"], &["Maria"], "we're gonna celebrate Maria");
        assert!(!with_whitelist
            .errors
            .iter()
            .any(|e| e.code == "informal_term"));
    }

    #[test]
    fn collective_brief_requires_collective_address() {
        let collective_report = |text: &str| {
            let parsed = parse_lyrics(text);
            let honored = vec!["Ana".to_string()];
            validate_lyrics(&ValidationInput {
                lyrics: &parsed,
                honored_names: &honored,
                brief_names: &[],
                addressee_number: AddresseeNumber::Collective,
                brief_text: "for Ana and Luis",
            })
        };

        // Fixture addresses "you", never the group
        let singular_text = complete_lyrics("Ana");
        assert!(collective_report(&singular_text)
            .errors
            .iter()
            .any(|e| e.code == "collective_address_missing"));

        let collective_text = singular_text
            .replace("The years were kind to all of us", "Both of you carried us through");
        assert!(!collective_report(&collective_text)
            .errors
            .iter()
            .any(|e| e.code == "collective_address_missing"));
    }

    #[test]
    fn corrective_instruction_enumerates_violations() {
        let text = complete_lyrics("Maria").replace("[Bridge]\nEvery road led back to this door\n", "");
        let report = validate(&text, &["Maria"], &["Maria"], "for Maria");
        let instruction = report.corrective_instruction();
        assert!(instruction.contains("missing_section:bridge"));
        assert!(instruction.starts_with("The previous lyrics violated"));
    }
}
