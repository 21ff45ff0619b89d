use thiserror::Error;

pub type CalcResult<T> = Result<T, CalcError>;

#[derive(Error, Debug)]
pub enum CalcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Metric fetch failed for '{key}': {message}")]
    Fetch { key: String, message: String },

    #[error("Variable lookup failed for '{id}': {message}")]
    Lookup { id: String, message: String },

    #[error("Invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange { start: String, end: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Evaluation task failed: {0}")]
    Task(String),
}

impl CalcError {
    pub fn fetch(key: impl Into<String>, message: impl Into<String>) -> Self {
        CalcError::Fetch {
            key: key.into(),
            message: message.into(),
        }
    }

    pub fn lookup(id: impl Into<String>, message: impl Into<String>) -> Self {
        CalcError::Lookup {
            id: id.into(),
            message: message.into(),
        }
    }
}
