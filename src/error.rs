//! Error types and handling for the `kaze` service

use thiserror::Error;

use crate::gateway::{GatewayError, Lookup};

/// Main error type for the `kaze` service
#[derive(Error, Debug)]
pub enum KazeError {
    /// Malformed create/update input, rejected before any store call
    #[error("Invalid input: {message}")]
    Validation { message: String },

    /// The store holds no power plant with the given ID
    #[error("Power plant not found: {id}")]
    NotFound { id: String },

    /// Underlying persistence failure
    #[error("Store error during {operation}: {message}")]
    Store {
        operation: &'static str,
        message: String,
    },

    /// One of the external lookups failed for an entity
    #[error("Can't get {lookup} data from the api: {source}")]
    Enrichment {
        lookup: Lookup,
        #[source]
        source: GatewayError,
    },

    /// Malformed inbound query, unknown field or bad argument
    #[error("Query error: {message}")]
    Query { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Response serialization errors
    #[error("Serialization error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },
}

impl KazeError {
    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a new not-found error
    pub fn not_found<S: Into<String>>(id: S) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Create a new store error carrying the failing operation
    pub fn store<S: ToString>(operation: &'static str, message: S) -> Self {
        Self::Store {
            operation,
            message: message.to_string(),
        }
    }

    /// Create a new enrichment error for the given lookup
    pub fn enrichment(lookup: Lookup, source: GatewayError) -> Self {
        Self::Enrichment { lookup, source }
    }

    /// Create a new query error
    pub fn query<S: Into<String>>(message: S) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Stable machine-readable code, reported to GraphQL clients as `extensions.code`
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            KazeError::Validation { .. } => "VALIDATION_FAILED",
            KazeError::NotFound { .. } => "NOT_FOUND",
            KazeError::Store { .. } => "STORE_FAILURE",
            KazeError::Enrichment { .. } => "ENRICHMENT_FAILED",
            KazeError::Query { .. } => "BAD_QUERY",
            KazeError::Config { .. } => "CONFIGURATION",
            KazeError::Json { .. } => "INTERNAL",
        }
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            KazeError::Validation { message } => format!("Invalid input: {message}"),
            KazeError::NotFound { id } => format!("No power plant with id {id}"),
            KazeError::Store { .. } => {
                "The power plant store is unavailable. Please try again later.".to_string()
            }
            KazeError::Enrichment { lookup, .. } => {
                format!("Unable to fetch {lookup} data from the weather service.")
            }
            KazeError::Query { message } => message.clone(),
            KazeError::Config { .. } => {
                "Configuration error. Please check your config file and environment.".to_string()
            }
            KazeError::Json { .. } => "Internal error while building the response.".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let validation_err = KazeError::validation("latitude out of range");
        assert!(matches!(validation_err, KazeError::Validation { .. }));

        let not_found = KazeError::not_found("42");
        assert!(matches!(not_found, KazeError::NotFound { ref id } if id == "42"));

        let store_err = KazeError::store("list", "connection reset");
        assert!(matches!(
            store_err,
            KazeError::Store {
                operation: "list",
                ..
            }
        ));
    }

    #[test]
    fn test_enrichment_error_names_lookup() {
        let err = KazeError::enrichment(Lookup::Forecast, GatewayError::Status { status: 503 });
        let message = err.to_string();
        assert!(message.contains("forecast"));
        assert!(message.contains("503"));
        assert_eq!(err.code(), "ENRICHMENT_FAILED");
    }

    #[test]
    fn test_user_messages() {
        let validation_err = KazeError::validation("name is required");
        assert!(validation_err.user_message().contains("name is required"));

        let elevation_err = KazeError::enrichment(Lookup::Elevation, GatewayError::EmptyElevation);
        assert!(elevation_err.user_message().contains("elevation"));

        let store_err = KazeError::store("create", "boom");
        assert!(!store_err.user_message().contains("boom"));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: KazeError = json_err.into();
        assert!(matches!(err, KazeError::Json { .. }));
    }
}
