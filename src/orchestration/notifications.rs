//! # Deduplicated Notification Dispatch
//!
//! Best-effort customer messaging with at-most-once delivery per
//! `(order, kind)`: the dedup guard reads successful sends from
//! `notification_log` before attempting, and every attempt's outcome is
//! recorded there regardless of result. Dispatch itself is infallible — a
//! failed send is an outcome, not an error, because nothing upstream should
//! roll back over a missed email.

use super::PipelineContext;
use crate::clients::NotificationRequest;
use crate::models::{NotificationLog, Order};
use crate::resilience::{with_retry, with_timeout, RetryPolicy};
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    OrderPaid,
    SongReady,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrderPaid => "order_paid",
            Self::SongReady => "song_ready",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOutcome {
    pub sent: bool,
    /// True when the dedup guard found a prior successful send.
    pub already_sent: bool,
    pub error: Option<String>,
}

/// Send one notification for an order, once. Never returns an error; see
/// module docs.
pub async fn dispatch(
    ctx: &PipelineContext,
    order: &Order,
    kind: NotificationKind,
) -> NotificationOutcome {
    match NotificationLog::has_successful_send(&ctx.pool, order.id, kind.as_str()).await {
        Ok(true) => {
            info!(order_id = order.id, kind = %kind, "notification already delivered, skipping");
            return NotificationOutcome {
                sent: false,
                already_sent: true,
                error: None,
            };
        }
        Ok(false) => {}
        Err(err) => {
            // Guard unreadable: do not send blind, a duplicate is worse than
            // a delay. The trigger will fire again.
            warn!(order_id = order.id, kind = %kind, error = %err, "dedup guard read failed");
            return NotificationOutcome {
                sent: false,
                already_sent: false,
                error: Some(err.to_string()),
            };
        }
    }

    let request = build_request(ctx, order, kind);
    let timeout = Duration::from_millis(ctx.config.notifications.request_timeout_ms);
    let policy = RetryPolicy::notification(ctx.config.notifications.max_attempts);
    let result = with_retry("notification_send", &policy, || async {
        with_timeout("notification_send", timeout, ctx.notifier.send(&request)).await
    })
    .await;

    let (success, message_id, error) = match &result {
        Ok(id) => (true, Some(id.as_str()), None),
        Err(err) => (false, None, Some(err.to_string())),
    };
    if let Err(log_err) = NotificationLog::record(
        &ctx.pool,
        order.id,
        kind.as_str(),
        success,
        message_id,
        error.as_deref(),
    )
    .await
    {
        warn!(order_id = order.id, kind = %kind, error = %log_err, "notification audit write failed");
    }

    match result {
        Ok(message_id) => {
            info!(order_id = order.id, kind = %kind, message_id, "notification delivered");
            NotificationOutcome {
                sent: true,
                already_sent: false,
                error: None,
            }
        }
        Err(err) => NotificationOutcome {
            sent: false,
            already_sent: false,
            error: Some(err.to_string()),
        },
    }
}

fn build_request(ctx: &PipelineContext, order: &Order, kind: NotificationKind) -> NotificationRequest {
    let name = order
        .customer_name
        .as_deref()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or("there");
    let (subject, body) = match kind {
        NotificationKind::OrderPaid => (
            "Your song is on its way".to_string(),
            format!(
                "Hi {name},\n\nWe received your payment for order #{}. \
                 Our writers are already at work — you'll hear from us as soon \
                 as the lyrics are ready for your review.\n",
                order.id
            ),
        ),
        NotificationKind::SongReady => (
            "Your song is ready".to_string(),
            format!(
                "Hi {name},\n\nYour personalized song for order #{} is finished. \
                 Log in to listen and download it.\n",
                order.id
            ),
        ),
    };
    NotificationRequest {
        to: order.customer_email.clone(),
        subject,
        body,
        sender: ctx.config.notifications.sender.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strings_are_stable() {
        // These are persisted in notification_log; changing one would break
        // dedup against historical rows.
        assert_eq!(NotificationKind::OrderPaid.as_str(), "order_paid");
        assert_eq!(NotificationKind::SongReady.as_str(), "song_ready");
    }
}
