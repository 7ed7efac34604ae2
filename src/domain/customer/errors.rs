use crate::errors::AppError;

// ============================================================================
// Customer Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CustomerError {
    #[error("credit must be greater than 0")]
    CreditMustBePositive,

    #[error("amount must be greater than 0")]
    AmountMustBePositive,

    #[error("insufficient credit")]
    InsufficientCredit,

    #[error("credit would exceed the maximum balance")]
    CreditOverflow,

    #[error("email already exists")]
    EmailExists,

    #[error("the customer with given id was not found")]
    NotFound,

    #[error("email is required")]
    EmptyEmail,

    #[error("email is invalid: {0}")]
    InvalidEmail(String),
}

impl From<CustomerError> for AppError {
    fn from(err: CustomerError) -> Self {
        match err {
            CustomerError::CreditMustBePositive
            | CustomerError::AmountMustBePositive
            | CustomerError::InsufficientCredit
            | CustomerError::CreditOverflow => AppError::business_rule(err.to_string()),
            CustomerError::EmailExists => AppError::conflict(err.to_string()),
            CustomerError::NotFound => AppError::not_found(err.to_string()),
            CustomerError::EmptyEmail | CustomerError::InvalidEmail(_) => {
                AppError::input_validation(err.to_string())
            }
        }
    }
}
