//! Addressing classification over normalized brief text.
//!
//! A table of `(pattern, category, weight)` rules is matched against the
//! lowercased text; scores are summed per category and the highest-scoring
//! category wins. Ties fall back to a fixed default (feminine briefs are the
//! observed majority for gender; singular for addressee number), so the
//! result is deterministic for any input.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Feminine,
    Masculine,
    Neutral,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddresseeNumber {
    Singular,
    Collective,
}

/// The classifier's verdict for one brief.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressingProfile {
    pub gender: Gender,
    pub number: AddresseeNumber,
}

#[derive(Debug, Clone, Copy)]
enum Category {
    Feminine,
    Masculine,
    Collective,
}

/// Scoring rules. Weights reflect how strongly a pattern pins the category:
/// an explicit relationship word outweighs a stray pronoun.
const RULES: &[(&str, Category, u32)] = &[
    // Relationship words
    ("wife", Category::Feminine, 5),
    ("girlfriend", Category::Feminine, 5),
    ("mother", Category::Feminine, 5),
    ("mom", Category::Feminine, 5),
    ("mum", Category::Feminine, 5),
    ("grandma", Category::Feminine, 5),
    ("grandmother", Category::Feminine, 5),
    ("daughter", Category::Feminine, 5),
    ("sister", Category::Feminine, 5),
    ("aunt", Category::Feminine, 5),
    ("husband", Category::Masculine, 5),
    ("boyfriend", Category::Masculine, 5),
    ("father", Category::Masculine, 5),
    ("dad", Category::Masculine, 5),
    ("grandpa", Category::Masculine, 5),
    ("grandfather", Category::Masculine, 5),
    ("son", Category::Masculine, 5),
    ("brother", Category::Masculine, 5),
    ("uncle", Category::Masculine, 5),
    // Pronouns
    ("she", Category::Feminine, 2),
    ("her", Category::Feminine, 2),
    ("hers", Category::Feminine, 2),
    ("he", Category::Masculine, 2),
    ("him", Category::Masculine, 2),
    ("his", Category::Masculine, 2),
    // Collective markers
    ("they", Category::Collective, 2),
    ("them", Category::Collective, 2),
    ("both", Category::Collective, 3),
    ("parents", Category::Collective, 5),
    ("grandparents", Category::Collective, 5),
    ("couple", Category::Collective, 4),
    ("family", Category::Collective, 4),
    ("friends", Category::Collective, 4),
    ("team", Category::Collective, 4),
    ("colleagues", Category::Collective, 4),
    ("everyone", Category::Collective, 3),
    ("all of you", Category::Collective, 4),
];

/// Collective nouns that mark a multi-person subject even when named as a
/// single recipient field ("the Smith family", "our team").
const COLLECTIVE_SUBJECTS: &[&str] = &[
    "family", "team", "parents", "grandparents", "couple", "friends", "colleagues", "class",
    "crew", "band",
];

/// Classify gender and addressee number from the brief's free text.
///
/// `honored_names` is the list of explicitly honored subjects; naming two or
/// more forces a collective addressee regardless of text score, as does a
/// collective-noun recipient.
pub fn classify_addressing(text: &str, recipient: &str, honored_names: &[String]) -> AddressingProfile {
    let normalized = normalize(text);
    let words: Vec<&str> = normalized.split_whitespace().collect();

    let mut feminine = 0u32;
    let mut masculine = 0u32;
    let mut collective = 0u32;

    for (pattern, category, weight) in RULES {
        let hits = if pattern.contains(' ') {
            if normalized.contains(pattern) {
                1
            } else {
                0
            }
        } else {
            words.iter().filter(|w| *w == pattern).count() as u32
        };
        if hits == 0 {
            continue;
        }
        let score = hits * weight;
        match category {
            Category::Feminine => feminine += score,
            Category::Masculine => masculine += score,
            Category::Collective => collective += score,
        }
    }

    let recipient_lower = recipient.to_lowercase();
    let collective_subject = COLLECTIVE_SUBJECTS
        .iter()
        .any(|noun| recipient_lower.split_whitespace().any(|w| w == *noun));

    let number = if honored_names.len() >= 2
        || collective_subject
        || collective > feminine.max(masculine)
    {
        AddresseeNumber::Collective
    } else {
        AddresseeNumber::Singular
    };

    // Ties (including all-zero) fall to feminine, the fixed default.
    let gender = if masculine > feminine {
        Gender::Masculine
    } else if feminine > 0 || masculine > 0 {
        Gender::Feminine
    } else {
        Gender::Neutral
    };

    AddressingProfile { gender, number }
}

fn normalize(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relationship_word_pins_feminine() {
        let profile = classify_addressing(
            "A song for my wife, she has always supported me",
            "Maria",
            &["Maria".to_string()],
        );
        assert_eq!(profile.gender, Gender::Feminine);
        assert_eq!(profile.number, AddresseeNumber::Singular);
    }

    #[test]
    fn relationship_word_pins_masculine() {
        let profile = classify_addressing(
            "My dad taught me everything, he never gave up on us",
            "Carlos",
            &["Carlos".to_string()],
        );
        assert_eq!(profile.gender, Gender::Masculine);
    }

    #[test]
    fn relationship_outweighs_stray_pronoun() {
        // "his" appears once but "grandmother" is the subject
        let profile = classify_addressing(
            "For my grandmother who raised me and her garden, his old photos remind me of her",
            "Rosa",
            &["Rosa".to_string()],
        );
        assert_eq!(profile.gender, Gender::Feminine);
    }

    #[test]
    fn two_honored_names_force_collective() {
        let profile = classify_addressing(
            "A song for my wife",
            "Ana and Luis",
            &["Ana".to_string(), "Luis".to_string()],
        );
        assert_eq!(profile.number, AddresseeNumber::Collective);
    }

    #[test]
    fn collective_noun_recipient_forces_collective() {
        let profile =
            classify_addressing("celebrating twenty years together", "the Rivera family", &[]);
        assert_eq!(profile.number, AddresseeNumber::Collective);
    }

    #[test]
    fn neutral_when_no_signal() {
        let profile = classify_addressing("a song about the sea and long journeys", "Alex", &[]);
        assert_eq!(profile.gender, Gender::Neutral);
        assert_eq!(profile.number, AddresseeNumber::Singular);
    }

    #[test]
    fn classification_is_deterministic() {
        let text = "for my parents, they gave us everything";
        let a = classify_addressing(text, "Mom and Dad", &[]);
        let b = classify_addressing(text, "Mom and Dad", &[]);
        assert_eq!(a, b);
        assert_eq!(a.number, AddresseeNumber::Collective);
    }
}
