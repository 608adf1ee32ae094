use quarry_core::ValidationErrors;

/// Errors that can occur in the data layer.
///
/// Every contract violation is raised where it happens and is never retried.
/// Failures coming from the store itself travel untouched inside
/// [`DataError::Database`].
#[derive(Debug)]
pub enum DataError {
    /// A required argument was absent.
    NullArgument(&'static str),
    /// A numeric argument or enumerated value lies outside its accepted range.
    OutOfRange {
        argument: &'static str,
        message: String,
    },
    /// The operation is not valid in the current state.
    InvalidState(String),
    /// A property selector does not name a declared property directly.
    InvalidSelector(String),
    /// The store provider has no implementation for the requested operation.
    UnsupportedOperation(String),
    /// The entity failed its own validation contract.
    ValidationFailed(ValidationErrors),
    /// Pass-through failure from the underlying store.
    Database(Box<dyn std::error::Error + Send + Sync>),
    Other(String),
}

impl DataError {
    /// Construct a `Database` variant from any error type.
    ///
    /// Used by backend crates (e.g. `quarry-data-sqlx`) to wrap driver errors.
    pub fn database(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        DataError::Database(Box::new(err))
    }

    pub(crate) fn out_of_range(argument: &'static str, message: impl Into<String>) -> Self {
        DataError::OutOfRange {
            argument,
            message: message.into(),
        }
    }

    pub fn is_null_argument(&self) -> bool {
        matches!(self, DataError::NullArgument(_))
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self, DataError::OutOfRange { .. })
    }
}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataError::NullArgument(name) => write!(f, "Argument '{name}' must not be null"),
            DataError::OutOfRange { argument, message } => {
                write!(f, "Argument '{argument}' is out of range: {message}")
            }
            DataError::InvalidState(msg) => write!(f, "Invalid state: {msg}"),
            DataError::InvalidSelector(msg) => write!(f, "Invalid selector: {msg}"),
            DataError::UnsupportedOperation(msg) => write!(f, "Unsupported operation: {msg}"),
            DataError::ValidationFailed(errors) => write!(f, "Validation failed: {errors}"),
            DataError::Database(err) => write!(f, "Database error: {err}"),
            DataError::Other(msg) => write!(f, "Data error: {msg}"),
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DataError::Database(err) => Some(err.as_ref()),
            DataError::ValidationFailed(errors) => Some(errors),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for DataError {
    fn from(errors: ValidationErrors) -> Self {
        DataError::ValidationFailed(errors)
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::Other(format!("entity conversion failed: {err}"))
    }
}

impl From<crate::query::QueryError> for DataError {
    fn from(err: crate::query::QueryError) -> Self {
        match err {
            crate::query::QueryError::InvalidIdentifier { .. } => {
                DataError::InvalidSelector(err.to_string())
            }
            crate::query::QueryError::MissingKey { .. }
            | crate::query::QueryError::EmptyUpdate { .. } => DataError::Other(err.to_string()),
        }
    }
}
