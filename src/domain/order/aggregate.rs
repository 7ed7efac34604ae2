use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::errors::OrderError;

// ============================================================================
// Order Entity
// ============================================================================
//
// An order reserves `order_total` of its customer's credit while active.
// Canceling is one-way: `canceled_at` is set once and never cleared.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub order_total: i64,
    pub created_at: DateTime<Utc>,
    pub canceled_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn new(customer_id: Uuid, order_total: i64) -> Result<Self, OrderError> {
        if order_total <= 0 {
            return Err(OrderError::TotalMustBePositive);
        }
        Ok(Self {
            id: Uuid::now_v7(),
            customer_id,
            order_total,
            created_at: Utc::now(),
            canceled_at: None,
        })
    }

    pub fn is_active(&self) -> bool {
        self.canceled_at.is_none()
    }

    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.is_active() {
            return Err(OrderError::AlreadyCanceled);
        }
        self.canceled_at = Some(Utc::now());
        Ok(())
    }
}
