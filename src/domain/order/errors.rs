use crate::errors::AppError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OrderError {
    #[error("the order with given id was not found")]
    NotFound,

    #[error("order total must be greater than 0")]
    TotalMustBePositive,

    #[error("order is already canceled")]
    AlreadyCanceled,
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::NotFound => AppError::not_found(err.to_string()),
            OrderError::TotalMustBePositive | OrderError::AlreadyCanceled => {
                AppError::business_rule(err.to_string())
            }
        }
    }
}
