//! Proper-name extraction from brief text.
//!
//! Capitalized tokens survive two filters: a common-word list (sentence
//! starters, months, places the briefs mention constantly) and a role-word
//! list (Mom, Grandpa, Coach, ...). What remains is treated as a name that
//! the generated lyrics must mention.

/// Words that are capitalized in running text without being names.
const COMMON_WORDS: &[&str] = &[
    "i", "a", "the", "my", "our", "we", "he", "she", "they", "it", "you", "your", "yours",
    "you're", "you've", "you'll", "and", "but", "or", "so",
    "when", "then", "this", "that", "his", "her", "their", "dear", "happy", "birthday",
    "christmas", "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "also", "after", "before", "every", "once", "one", "two",
    "please", "thanks", "thank", "love", "from", "for", "with", "without", "she's", "he's",
    "i'm", "it's", "there", "here", "because", "years", "year",
];

/// Relationship and role words: capitalized as address forms but not names.
const ROLE_WORDS: &[&str] = &[
    "mom", "mum", "dad", "mother", "father", "grandma", "grandpa", "grandmother", "grandfather",
    "aunt", "uncle", "sister", "brother", "wife", "husband", "son", "daughter", "cousin",
    "coach", "teacher", "doctor", "professor", "boss", "captain", "nana", "papa", "granny",
    "auntie", "baby", "honey", "sweetheart", "darling",
];

/// Extract proper names, deduplicated, in order of first appearance.
pub fn extract_proper_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();

    for raw in text.split_whitespace() {
        let token: String = raw
            .chars()
            .filter(|c| c.is_alphanumeric() || *c == '\'' || *c == '-')
            .collect();
        if token.len() < 2 {
            continue;
        }

        let mut chars = token.chars();
        let first = match chars.next() {
            Some(c) => c,
            None => continue,
        };
        if !first.is_uppercase() {
            continue;
        }
        // All-caps tokens are shouting, not names
        if token.chars().all(|c| !c.is_lowercase()) {
            continue;
        }

        let lower = token.to_lowercase();
        if COMMON_WORDS.contains(&lower.as_str()) || ROLE_WORDS.contains(&lower.as_str()) {
            continue;
        }

        if !names.iter().any(|n| n.eq_ignore_ascii_case(&token)) {
            names.push(token);
        }
    }

    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_names_and_keeps_first_appearance_order() {
        let names = extract_proper_names(
            "This song is for Maria. Maria and Carlos met in Lisbon when they were young.",
        );
        assert_eq!(names, vec!["Maria", "Carlos", "Lisbon"]);
    }

    #[test]
    fn filters_role_words() {
        let names = extract_proper_names("Happy birthday Grandma Rosa, from Coach and the team");
        assert_eq!(names, vec!["Rosa"]);
    }

    #[test]
    fn filters_sentence_starters_and_common_words() {
        let names = extract_proper_names("When I was young, The sea called to Pedro every June");
        assert_eq!(names, vec!["Pedro"]);
    }

    #[test]
    fn ignores_all_caps_shouting() {
        let names = extract_proper_names("WE LOVE YOU Sofia SO MUCH");
        assert_eq!(names, vec!["Sofia"]);
    }

    #[test]
    fn second_person_openers_are_not_names() {
        let names = extract_proper_names(
            "You carried me through the storm. Your kindness never failed, Maria. You're the reason",
        );
        assert_eq!(names, vec!["Maria"]);
    }

    #[test]
    fn empty_text_yields_no_names() {
        assert!(extract_proper_names("").is_empty());
        assert!(extract_proper_names("a quiet song about rain").is_empty());
    }
}
