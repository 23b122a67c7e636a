use thiserror::Error;

/// Main error type for the GreyGoose system
#[derive(Error, Debug)]
pub enum GgError {
    #[error("Data error: {0}")]
    Data(#[from] DataError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Persistence error at {path}: {message}")]
    Persistence { path: String, message: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl GgError {
    /// Wrap an I/O or serialization failure on an artifact path.
    pub fn persistence(path: impl AsRef<std::path::Path>, err: impl std::fmt::Display) -> Self {
        GgError::Persistence {
            path: path.as_ref().display().to_string(),
            message: err.to_string(),
        }
    }
}

/// Data-related errors
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Data source not found: {0}")]
    SourceNotFound(String),

    #[error("Invalid data format: {message}")]
    InvalidFormat { message: String },

    #[error("Insufficient data: {message}")]
    InsufficientData { message: String },

    #[error("Data loading failed: {message}")]
    LoadingFailed { message: String },

    #[error("Column not found: {column}")]
    ColumnNotFound { column: String },

    #[error("Column length mismatch: {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },
}

/// Model training and inference errors
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Invalid hyperparameter {name}: {message}")]
    InvalidHyperparameter { name: String, message: String },

    #[error("Model not fitted: call fit() before {operation}")]
    NotFitted { operation: String },

    #[error("Training diverged at epoch {epoch}: loss is {loss}")]
    Diverged { epoch: usize, loss: f64 },

    #[error("Shape mismatch: expected {expected} features, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Empty training set")]
    EmptyTrainingSet,

    #[error("Cross-validation failed: {message}")]
    CrossValidation { message: String },
}

/// Result type alias for GreyGoose operations
pub type GgResult<T> = Result<T, GgError>;

/// Macro for creating validation errors
#[macro_export]
macro_rules! validation_error {
    ($($arg:tt)*) => {
        $crate::GgError::Validation(format!($($arg)*))
    };
}

/// Macro for creating internal errors
#[macro_export]
macro_rules! internal_error {
    ($($arg:tt)*) => {
        $crate::GgError::Internal(format!($($arg)*))
    };
}

/// Macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::GgError::Config(format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ModelError::Diverged {
            epoch: 7,
            loss: f64::INFINITY,
        };

        assert!(error.to_string().contains("diverged"));
        assert!(error.to_string().contains("epoch 7"));
        assert!(error.to_string().contains("inf"));
    }

    #[test]
    fn test_error_conversion() {
        let data_error = DataError::ColumnNotFound {
            column: "Cylinders".to_string(),
        };
        let gg_error: GgError = data_error.into();

        match gg_error {
            GgError::Data(_) => (),
            _ => panic!("Expected Data error"),
        }
    }

    #[test]
    fn test_persistence_error_names_path() {
        let err = GgError::persistence("results/best_params.json", "permission denied");
        let msg = err.to_string();
        assert!(msg.contains("results/best_params.json"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn test_macros() {
        let validation_err = validation_error!("Invalid value: {}", 42);
        let internal_err = internal_error!("Something went wrong");
        let config_err = config_error!("lower[{}] > upper[{}]", 1, 1);

        assert!(matches!(validation_err, GgError::Validation(_)));
        assert!(matches!(internal_err, GgError::Internal(_)));
        assert_eq!(config_err.to_string(), "Configuration error: lower[1] > upper[1]");
    }
}
