//! # External Service Clients
//!
//! Trait seams for every external collaborator, with reqwest-backed
//! production implementations. The orchestration layer depends only on the
//! traits, so the regeneration loop, the dispatcher, and the callback
//! processor are all testable with in-memory stubs.
//!
//! Callers own the resilience story: each invocation is wrapped in
//! [`with_timeout`](crate::resilience::with_timeout) and
//! [`with_retry`](crate::resilience::with_retry) at the call site, with the
//! policy appropriate to that step.

pub mod lyrics;
pub mod media;
pub mod notifier;
pub mod synthesis;

pub use lyrics::{HttpLyricsGenerator, LyricsGenerator, LyricsRequest};
pub use media::{HttpMediaStore, MediaStore};
pub use notifier::{HttpNotifier, NotificationRequest, Notifier};
pub use synthesis::{HttpSynthesisProvider, SynthesisProvider, SynthesisRequest};
