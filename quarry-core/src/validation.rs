use serde::Serialize;

/// A field-level validation error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    pub code: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: "validation".to_string(),
        }
    }
}

/// The set of violations reported by a model's own validation contract.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationErrors {
    pub errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Names of the offending fields, in report order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} validation error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "; {}: {}", error.field, error.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Run garde validation on `model` and convert the report.
///
/// ```ignore
/// impl Entity for Book {
///     fn validate(&self) -> Result<(), ValidationErrors> {
///         quarry_core::validation::validate_model(self)
///     }
/// }
/// ```
pub fn validate_model<T>(model: &T) -> Result<(), ValidationErrors>
where
    T: garde::Validate,
    T::Context: Default,
{
    model.validate().map_err(|report| convert_garde_report(&report))
}

fn convert_garde_report(report: &garde::Report) -> ValidationErrors {
    let errors = report
        .iter()
        .map(|(path, error)| {
            let field = path.to_string();
            let field = if field.is_empty() { "value".to_string() } else { field };
            FieldError::new(field, error.message().to_string())
        })
        .collect();
    ValidationErrors { errors }
}

pub use garde::Validate;
