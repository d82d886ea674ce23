//! # Webhook Ingestion & Idempotency Guard
//!
//! Drives an order from `pending` to `paid` off provider webhooks that may
//! arrive more than once, late, or out of order. The paid transition is
//! at-most-once: the idempotency read plus the conditional update in
//! [`Order::mark_paid`] guarantee one transition no matter how many
//! deliveries race. Downstream actions (job creation, generation kickoff,
//! notification) are best-effort and never fail the webhook response.
//!
//! Every delivery outcome — found or not, paid or already paid — lands in
//! `webhook_log`.

use super::{lyrics_orchestrator, notifications, PipelineContext};
use crate::error::{Error, Result};
use crate::models::{Job, NewJob, Order, WebhookLog};
use crate::orchestration::notifications::NotificationKind;
use crate::state_machine::{order_target_state, OrderEvent, OrderStatus, TransitionError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Vendor webhook body. Field names follow the provider's wire format.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub secret: Option<String>,
    pub status: Option<String>,
    pub email: Option<String>,
    pub transaction_id: Option<String>,
    /// Provider-echoed reference to our order id, when the checkout set one.
    pub external_reference: Option<String>,
    pub provider: Option<String>,
}

/// The canonical status set every vendor-specific string maps into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalStatus {
    Approved,
    Refunded,
    Cancelled,
    Pending,
}

impl fmt::Display for CanonicalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Approved => write!(f, "approved"),
            Self::Refunded => write!(f, "refunded"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::Pending => write!(f, "pending"),
        }
    }
}

/// Fixed vendor-status mapping. Unmapped values default to `pending`, which
/// is observed and not acted on.
pub fn normalize_status(raw: &str) -> CanonicalStatus {
    match raw.trim().to_lowercase().as_str() {
        "approved" | "paid" | "completed" | "confirmed" | "capture" | "captured" | "success" => {
            CanonicalStatus::Approved
        }
        "refunded" | "refund" | "chargeback" | "charged_back" => CanonicalStatus::Refunded,
        "cancelled" | "canceled" | "expired" | "voided" => CanonicalStatus::Cancelled,
        _ => CanonicalStatus::Pending,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WebhookOutcome {
    pub success: bool,
    pub already_paid: bool,
    /// Non-approval status observed and acknowledged without mutation.
    pub ignored: bool,
    pub order_id: Option<i64>,
    pub message: String,
}

/// Process one webhook delivery. Returns `Err` only for authentication
/// failure, unresolvable orders, or storage faults on the primary path;
/// downstream best-effort failures are logged and swallowed.
pub async fn process_payment_webhook(
    ctx: &Arc<PipelineContext>,
    payload: &WebhookPayload,
) -> Result<WebhookOutcome> {
    authenticate(ctx, payload)?;

    let raw_status = payload.status.as_deref().unwrap_or("");
    let canonical = normalize_status(raw_status);

    if canonical != CanonicalStatus::Approved {
        info!(status = %canonical, raw = raw_status, "non-approval webhook observed, no action");
        log_outcome(ctx, payload, canonical, "ignored", None, None).await;
        return Ok(WebhookOutcome {
            success: true,
            already_paid: false,
            ignored: true,
            order_id: None,
            message: format!("ignored: status is {canonical}, not an approval"),
        });
    }

    let order = match resolve_order(ctx, payload).await? {
        Some(order) => order,
        None => {
            warn!(
                transaction_id = payload.transaction_id.as_deref(),
                email = payload.email.as_deref(),
                "webhook order not found"
            );
            log_outcome(ctx, payload, canonical, "order_not_found", None, None).await;
            return Err(Error::not_found("no order matches this payment"));
        }
    };

    // Transition check before the conditional write. The write still
    // carries its own race-closing condition.
    let current = order
        .status
        .parse::<OrderStatus>()
        .map_err(Error::state_inconsistency)?;
    match approval_disposition(current) {
        ApprovalDisposition::MarkPaid => {}
        ApprovalDisposition::AlreadyPaid => {
            log_outcome(ctx, payload, canonical, "already_paid", Some(order.id), None).await;
            return Ok(WebhookOutcome {
                success: true,
                already_paid: true,
                ignored: false,
                order_id: Some(order.id),
                message: "already paid".to_string(),
            });
        }
        ApprovalDisposition::NotPayable(reason) => {
            // A payment landing on a cancelled or refunded order: observed
            // and acknowledged, never applied.
            warn!(order_id = order.id, status = %order.status, "payment for non-payable order");
            log_outcome(
                ctx,
                payload,
                canonical,
                "invalid_transition",
                Some(order.id),
                Some(reason.as_str()),
            )
            .await;
            return Ok(WebhookOutcome {
                success: true,
                already_paid: false,
                ignored: true,
                order_id: Some(order.id),
                message: reason,
            });
        }
    }

    let marked = Order::mark_paid(
        &ctx.pool,
        order.id,
        payload.provider.as_deref(),
        payload.transaction_id.as_deref(),
    )
    .await
    .map_err(Error::from)?;

    let Some(paid_order) = marked else {
        // Lost the race to a concurrent delivery; same answer as above.
        log_outcome(ctx, payload, canonical, "already_paid", Some(order.id), None).await;
        return Ok(WebhookOutcome {
            success: true,
            already_paid: true,
            ignored: false,
            order_id: Some(order.id),
            message: "already paid".to_string(),
        });
    };

    info!(order_id = paid_order.id, "order marked paid");
    log_outcome(ctx, payload, canonical, "paid", Some(paid_order.id), None).await;

    fire_downstream(ctx, paid_order);

    Ok(WebhookOutcome {
        success: true,
        already_paid: false,
        ignored: false,
        order_id: Some(order.id),
        message: "payment processed".to_string(),
    })
}

/// How an approved payment applies to an order in its current state.
#[derive(Debug, Clone, PartialEq, Eq)]
enum ApprovalDisposition {
    /// Legal transition; proceed to the conditional `mark_paid` write.
    MarkPaid,
    /// Replayed delivery; acknowledge as success without a second transition.
    AlreadyPaid,
    /// Cancelled or refunded order; acknowledge and record, never apply.
    NotPayable(String),
}

fn approval_disposition(current: OrderStatus) -> ApprovalDisposition {
    match order_target_state(current, &OrderEvent::PaymentApproved) {
        Ok(_) => ApprovalDisposition::MarkPaid,
        Err(TransitionError::AlreadyPaid) => ApprovalDisposition::AlreadyPaid,
        Err(err @ TransitionError::Invalid { .. }) => {
            ApprovalDisposition::NotPayable(err.to_string())
        }
    }
}

/// Shared-secret check: the payment secret carried in the body, or the
/// internal service credential. Constant-time comparison either way.
fn authenticate(ctx: &PipelineContext, payload: &WebhookPayload) -> Result<()> {
    let presented = payload
        .secret
        .as_deref()
        .ok_or_else(|| Error::Unauthorized("webhook secret missing".to_string()))?;

    if constant_time_eq(presented, &ctx.config.webhook.payment_secret)
        || constant_time_eq(presented, &ctx.config.webhook.internal_secret)
    {
        Ok(())
    } else {
        Err(Error::Unauthorized("webhook secret mismatch".to_string()))
    }
}

/// Resolution priority: explicit external reference, stored transaction id,
/// then the most recent pending order for the payer's email.
async fn resolve_order(
    ctx: &PipelineContext,
    payload: &WebhookPayload,
) -> Result<Option<Order>> {
    if let Some(reference) = payload.external_reference.as_deref() {
        if let Ok(order_id) = reference.trim().parse::<i64>() {
            if let Some(order) = Order::find_by_id(&ctx.pool, order_id).await? {
                return Ok(Some(order));
            }
        }
    }

    if let Some(transaction_id) = payload.transaction_id.as_deref() {
        if let Some(order) = Order::find_by_transaction_id(&ctx.pool, transaction_id).await? {
            return Ok(Some(order));
        }
    }

    if let Some(email) = payload.email.as_deref() {
        if let Some(order) = Order::latest_pending_by_email(&ctx.pool, email).await? {
            return Ok(Some(order));
        }
    }

    Ok(None)
}

/// Kick off the paid-order pipeline. Each action is independent and
/// best-effort: a failure is logged and never rolls back the payment. Also
/// used by the admin `mark_as_paid` action so a manual mark behaves like a
/// webhook-driven one.
pub(crate) fn fire_downstream(ctx: &Arc<PipelineContext>, order: Order) {
    let generation_ctx = Arc::clone(ctx);
    let generation_order = order.clone();
    tokio::spawn(async move {
        let job = match Job::create(
            &generation_ctx.pool,
            &NewJob {
                order_id: generation_order.id,
            },
        )
        .await
        {
            Ok(job) => job,
            Err(err) => {
                warn!(order_id = generation_order.id, error = %err, "job creation failed");
                return;
            }
        };

        if let Err(err) =
            lyrics_orchestrator::run_generation(&generation_ctx, &generation_order, &job).await
        {
            warn!(
                order_id = generation_order.id,
                job_id = job.id,
                error = %err,
                "generation kickoff failed"
            );
        }
    });

    let notify_ctx = Arc::clone(ctx);
    tokio::spawn(async move {
        let outcome =
            notifications::dispatch(&notify_ctx, &order, NotificationKind::OrderPaid).await;
        if let Some(error) = outcome.error {
            warn!(order_id = order.id, error, "order-paid notification failed");
        }
    });
}

async fn log_outcome(
    ctx: &PipelineContext,
    payload: &WebhookPayload,
    canonical: CanonicalStatus,
    outcome: &str,
    order_id: Option<i64>,
    detail: Option<&str>,
) {
    if let Err(err) = WebhookLog::record(
        &ctx.pool,
        payload.transaction_id.as_deref(),
        payload.status.as_deref(),
        &canonical.to_string(),
        outcome,
        order_id,
        detail,
    )
    .await
    {
        warn!(error = %err, outcome, "webhook audit write failed");
    }
}

/// Length-safe constant-time string comparison for shared secrets.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a = a.as_bytes();
    let b = b.as_bytes();
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= (x ^ y) as usize;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_statuses_normalize_to_canonical_set() {
        assert_eq!(normalize_status("approved"), CanonicalStatus::Approved);
        assert_eq!(normalize_status("PAID"), CanonicalStatus::Approved);
        assert_eq!(normalize_status("captured"), CanonicalStatus::Approved);
        assert_eq!(normalize_status("refund"), CanonicalStatus::Refunded);
        assert_eq!(normalize_status("chargeback"), CanonicalStatus::Refunded);
        assert_eq!(normalize_status("canceled"), CanonicalStatus::Cancelled);
        assert_eq!(normalize_status("expired"), CanonicalStatus::Cancelled);
    }

    #[test]
    fn unmapped_status_defaults_to_pending() {
        assert_eq!(normalize_status("in_mediation"), CanonicalStatus::Pending);
        assert_eq!(normalize_status(""), CanonicalStatus::Pending);
        assert_eq!(normalize_status("weird-new-state"), CanonicalStatus::Pending);
    }

    #[test]
    fn pending_and_failed_orders_accept_an_approval() {
        assert_eq!(
            approval_disposition(OrderStatus::Pending),
            ApprovalDisposition::MarkPaid
        );
        assert_eq!(
            approval_disposition(OrderStatus::Failed),
            ApprovalDisposition::MarkPaid
        );
    }

    #[test]
    fn replayed_approval_is_acknowledged_without_a_second_transition() {
        assert_eq!(
            approval_disposition(OrderStatus::Paid),
            ApprovalDisposition::AlreadyPaid
        );
    }

    #[test]
    fn terminal_orders_are_not_payable() {
        assert!(matches!(
            approval_disposition(OrderStatus::Cancelled),
            ApprovalDisposition::NotPayable(_)
        ));
        assert!(matches!(
            approval_disposition(OrderStatus::Refunded),
            ApprovalDisposition::NotPayable(_)
        ));
    }

    #[test]
    fn constant_time_eq_basic_properties() {
        assert!(constant_time_eq("secret", "secret"));
        assert!(!constant_time_eq("secret", "secreT"));
        assert!(!constant_time_eq("secret", "secret-longer"));
        assert!(!constant_time_eq("", "x"));
        assert!(constant_time_eq("", ""));
    }
}
