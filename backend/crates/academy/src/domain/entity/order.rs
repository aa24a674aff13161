//! Order Entity
//!
//! One order per checkout session. The external payment session id is the
//! idempotency key and is unique across all orders.
//!
//! Transitions: `pending -> completed` and `pending -> failed`. `Refunded` is
//! stored but nothing moves an order into it; whether a refund should revoke
//! the course grant is an open product decision.

use chrono::{DateTime, Utc};
use kernel::id::{CourseId, OrderId, PromoCodeId, UserId};
use serde::Serialize;

use crate::domain::value_object::money::Money;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(i16)]
pub enum OrderStatus {
    Pending = 0,
    Completed = 1,
    Failed = 2,
    Refunded = 3,
}

impl OrderStatus {
    pub const fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            0 => Some(OrderStatus::Pending),
            1 => Some(OrderStatus::Completed),
            2 => Some(OrderStatus::Failed),
            3 => Some(OrderStatus::Refunded),
            _ => None,
        }
    }

    pub const fn code(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Failed => "failed",
            OrderStatus::Refunded => "refunded",
        }
    }

    /// Only pending orders may still change state
    pub const fn is_final(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub order_id: OrderId,
    pub user_id: UserId,
    pub course_id: CourseId,
    pub payment_session_id: String,
    pub status: OrderStatus,
    pub amount: Money,
    pub currency: String,
    pub promo_code_id: Option<PromoCodeId>,
    pub discount_amount: Money,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Fields shared by every order constructor
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub course_id: CourseId,
    pub payment_session_id: String,
    pub amount: Money,
    pub currency: String,
    pub promo_code_id: Option<PromoCodeId>,
    pub discount_amount: Money,
}

impl Order {
    fn from_draft(draft: OrderDraft, status: OrderStatus) -> Self {
        let now = Utc::now();
        Self {
            order_id: OrderId::new(),
            user_id: draft.user_id,
            course_id: draft.course_id,
            payment_session_id: draft.payment_session_id,
            status,
            amount: draft.amount,
            currency: draft.currency,
            promo_code_id: draft.promo_code_id,
            discount_amount: draft.discount_amount,
            created_at: now,
            completed_at: (status == OrderStatus::Completed).then_some(now),
        }
    }

    /// Recorded when the checkout session is created
    pub fn pending(draft: OrderDraft) -> Self {
        Self::from_draft(draft, OrderStatus::Pending)
    }

    /// Recorded when the provider confirms payment
    pub fn completed(draft: OrderDraft) -> Self {
        Self::from_draft(draft, OrderStatus::Completed)
    }

    /// Recorded when the session expires or the payment fails
    pub fn failed(draft: OrderDraft) -> Self {
        Self::from_draft(draft, OrderStatus::Failed)
    }
}
