use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backbone::messaging::Request;

// ============================================================================
// Customer Contracts
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCustomerCommand {
    pub email: String,
    pub credit: i64,
}

impl Request for CreateCustomerCommand {
    type Response = Uuid;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetCustomerByIdQuery {
    pub customer_id: Uuid,
}

impl Request for GetCustomerByIdQuery {
    type Response = CustomerInfo;
}

/// Read model other modules see for a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub id: Uuid,
    pub email: String,
    pub credit: i64,
}

/// Take `amount` from the customer's available credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveCreditCommand {
    pub customer_id: Uuid,
    pub amount: i64,
}

impl Request for ReserveCreditCommand {
    type Response = ();
}

/// Give `amount` back to the customer's available credit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleaseCreditCommand {
    pub customer_id: Uuid,
    pub amount: i64,
}

impl Request for ReleaseCreditCommand {
    type Response = ();
}
