//! # Data Layer
//!
//! Typed sqlx-backed modules, one per entity. Statuses persist as
//! snake_case TEXT and are parsed into the `state_machine` enums at the
//! logic boundary. Idempotency-critical writes are conditional updates
//! (`UPDATE ... WHERE status <> ...`) so races between concurrent process
//! instances are closed at the storage layer.

pub mod audit;
pub mod generation_task;
pub mod job;
pub mod lyrics_approval;
pub mod order;
pub mod quiz;
pub mod retry_queue_item;
pub mod song;

pub use audit::{NotificationLog, OrderCreationLog, WebhookLog};
pub use generation_task::{GenerationTask, NewGenerationTask};
pub use job::{Job, NewJob};
pub use lyrics_approval::{LyricsApproval, NewLyricsApproval};
pub use order::{NewOrder, Order};
pub use quiz::{NewQuiz, Quiz};
pub use retry_queue_item::{NewRetryQueueItem, RetryQueueItem};
pub use song::{NewSong, Song};
