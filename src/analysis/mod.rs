//! # Brief Text Analysis
//!
//! Pure, I/O-free analysis of the customer's free-text brief, feeding the
//! generation request and the lyrics validator:
//!
//! - [`addressing`] — scored rule tables classifying the grammatical gender
//!   of the honored subject and whether the addressee is singular or
//!   collective.
//! - [`names`] — proper-name extraction that filters common words and role
//!   words (Mom, Grandpa, ...).
//!
//! Both are deliberately isolated so they can be unit tested without any of
//! the pipeline around them.

pub mod addressing;
pub mod names;

pub use addressing::{classify_addressing, AddresseeNumber, AddressingProfile, Gender};
pub use names::extract_proper_names;
