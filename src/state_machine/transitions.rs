//! Order transition rules. Pure: the caller resolves the current state from
//! storage, asks for the target, and persists with a conditional update.

use super::states::OrderStatus;
use thiserror::Error;

/// Events that can move an order through its lifecycle. Payment approval
/// comes from the webhook path; the rest come from operator actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderEvent {
    PaymentApproved,
    MarkPaid,
    UnmarkPaid,
    Refund,
    Cancel,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("invalid transition from '{from}' on {event:?}")]
    Invalid { from: String, event: OrderEvent },

    /// The order is already paid; the caller should treat the event as
    /// already applied rather than as a failure.
    #[error("order already paid")]
    AlreadyPaid,
}

/// Determine the target state for an order event.
///
/// The pending→paid edge is monotonic: re-delivering an approval to a paid
/// order yields [`TransitionError::AlreadyPaid`], which webhook ingestion
/// reports as success with an `already_paid` flag. Paid is only left through
/// an explicit unmark or refund, both of which clear `paid_at`.
pub fn order_target_state(
    current: OrderStatus,
    event: &OrderEvent,
) -> Result<OrderStatus, TransitionError> {
    match (current, event) {
        (OrderStatus::Pending, OrderEvent::PaymentApproved | OrderEvent::MarkPaid) => {
            Ok(OrderStatus::Paid)
        }
        (OrderStatus::Failed, OrderEvent::PaymentApproved | OrderEvent::MarkPaid) => {
            Ok(OrderStatus::Paid)
        }
        (OrderStatus::Paid, OrderEvent::PaymentApproved | OrderEvent::MarkPaid) => {
            Err(TransitionError::AlreadyPaid)
        }
        (OrderStatus::Paid, OrderEvent::UnmarkPaid) => Ok(OrderStatus::Pending),
        (OrderStatus::Paid, OrderEvent::Refund) => Ok(OrderStatus::Refunded),
        (OrderStatus::Pending | OrderStatus::Failed, OrderEvent::Cancel) => {
            Ok(OrderStatus::Cancelled)
        }
        (from, event) => Err(TransitionError::Invalid {
            from: from.to_string(),
            event: event.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pending_order_becomes_paid_on_approval() {
        assert_eq!(
            order_target_state(OrderStatus::Pending, &OrderEvent::PaymentApproved).unwrap(),
            OrderStatus::Paid
        );
    }

    #[test]
    fn replayed_approval_reports_already_paid() {
        assert_eq!(
            order_target_state(OrderStatus::Paid, &OrderEvent::PaymentApproved),
            Err(TransitionError::AlreadyPaid)
        );
    }

    #[test]
    fn paid_is_only_left_via_unmark_or_refund() {
        assert_eq!(
            order_target_state(OrderStatus::Paid, &OrderEvent::UnmarkPaid).unwrap(),
            OrderStatus::Pending
        );
        assert_eq!(
            order_target_state(OrderStatus::Paid, &OrderEvent::Refund).unwrap(),
            OrderStatus::Refunded
        );
        assert!(matches!(
            order_target_state(OrderStatus::Paid, &OrderEvent::Cancel),
            Err(TransitionError::Invalid { .. })
        ));
    }

    #[test]
    fn cancelled_order_rejects_payment() {
        assert!(matches!(
            order_target_state(OrderStatus::Cancelled, &OrderEvent::PaymentApproved),
            Err(TransitionError::Invalid { .. })
        ));
    }
}
