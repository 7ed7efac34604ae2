use std::fmt;

// ============================================================================
// Application Error Taxonomy
// ============================================================================
//
// Every operation that crosses a module boundary fails with an `AppError`.
// The `kind` decides how the presentation layer reports it; the message is
// safe to show to a client, the source is for logs only.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InputValidation,
    Conflict,
    ResourceNotFound,
    BusinessRule,
    DataIntegrity,
    DatabaseFailure,
    OperationFailed,
    ServiceDependency,
    HandlerNotRegistered,
    ServiceNotFound,
    TransactionBegin,
    TransactionCommit,
    DuplicateRegistration,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::InputValidation => "input_validation_error",
            ErrorKind::Conflict => "conflict",
            ErrorKind::ResourceNotFound => "resource_not_found",
            ErrorKind::BusinessRule => "business_rule_error",
            ErrorKind::DataIntegrity => "data_integrity_error",
            ErrorKind::DatabaseFailure => "database_failure",
            ErrorKind::OperationFailed => "operation_failed",
            ErrorKind::ServiceDependency => "service_dependency_error",
            ErrorKind::HandlerNotRegistered => "handler_not_registered",
            ErrorKind::ServiceNotFound => "service_not_found",
            ErrorKind::TransactionBegin => "transaction_begin_failed",
            ErrorKind::TransactionCommit => "transaction_commit_failed",
            ErrorKind::DuplicateRegistration => "duplicate_registration",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("[{kind}] {message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn input_validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InputValidation, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ResourceNotFound, message)
    }

    pub fn business_rule(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BusinessRule, message)
    }

    pub fn data_integrity(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataIntegrity, message)
    }

    pub fn database_failure(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DatabaseFailure, message)
    }

    pub fn operation_failed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OperationFailed, message)
    }

    pub fn service_dependency(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ServiceDependency, message)
    }
}

// ============================================================================
// Database Error Mapping
// ============================================================================

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        use sqlx::error::ErrorKind as DbErrorKind;

        let mapped = match &err {
            sqlx::Error::RowNotFound => AppError::not_found("record not found"),
            sqlx::Error::Database(db_err) => match db_err.kind() {
                DbErrorKind::UniqueViolation => {
                    AppError::conflict(format!("duplicate entry detected: {}", db_err.message()))
                }
                DbErrorKind::ForeignKeyViolation => AppError::data_integrity(format!(
                    "foreign key constraint violation: {}",
                    db_err.message()
                )),
                DbErrorKind::NotNullViolation => AppError::data_integrity(format!(
                    "not null constraint violation: {}",
                    db_err.message()
                )),
                DbErrorKind::CheckViolation => AppError::data_integrity(format!(
                    "check constraint violation: {}",
                    db_err.message()
                )),
                _ => AppError::database_failure(format!("database error: {}", db_err.message())),
            },
            other => AppError::database_failure(other.to_string()),
        };

        mapped.with_source(err)
    }
}
