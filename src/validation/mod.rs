//! # Lyrics Validation
//!
//! Deterministic, I/O-free validation of generated lyrics against the
//! structural and addressing rules of the product. The orchestrator runs
//! this after every generation attempt and feeds the violated rules back as
//! a corrective instruction on regeneration.
//!
//! The rule set:
//!
//! a. all nine structural sections present, in the fixed order;
//! b. no banned filler terms;
//! c. honored names appear only in chorus-type sections, and at least once
//!    in a chorus;
//! d. every proper name extracted from the brief appears somewhere;
//! e. the honored subject is addressed in second person — no third-person
//!    pronouns referring to them;
//! f. no raw comma-separated word lists standing in for sentences;
//! g. informal terms only when the brief itself uses them verbatim;
//! h. collective-addressee briefs use collective address.

pub mod parser;
pub mod rules;

pub use parser::{parse_lyrics, ParsedLyrics, Section};
pub use rules::{validate_lyrics, RuleViolation, ValidationInput, ValidationReport};
