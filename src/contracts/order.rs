use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backbone::messaging::Request;

// ============================================================================
// Order Contracts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateOrderCommand {
    pub customer_id: Uuid,
    pub order_total: i64,
}

impl Request for CreateOrderCommand {
    type Response = Uuid;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelOrderCommand {
    pub order_id: Uuid,
}

impl Request for CancelOrderCommand {
    type Response = ();
}
