use crate::applications::ApplicationStoreError;
use crate::catalog::CatalogError;
use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Catalog(CatalogError),
    Applications(ApplicationStoreError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Catalog(err) => write!(f, "catalog error: {}", err),
            AppError::Applications(err) => write!(f, "application store error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Catalog(err) => Some(err),
            AppError::Applications(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Catalog(CatalogError::Validation(_))
            | AppError::Applications(ApplicationStoreError::Validation(_)) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Applications(ApplicationStoreError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Applications(
                ApplicationStoreError::Lifecycle(_) | ApplicationStoreError::StaleRevision { .. },
            ) => StatusCode::CONFLICT,
            AppError::Applications(ApplicationStoreError::Unauthorized) => StatusCode::FORBIDDEN,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Catalog(CatalogError::Persistence(_))
            | AppError::Applications(ApplicationStoreError::Persistence(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<CatalogError> for AppError {
    fn from(value: CatalogError) -> Self {
        Self::Catalog(value)
    }
}

impl From<ApplicationStoreError> for AppError {
    fn from(value: ApplicationStoreError) -> Self {
        Self::Applications(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applications::{ApplicationId, ApplicationStatus, LifecycleError};

    #[test]
    fn store_errors_keep_their_http_meaning() {
        let cases = [
            (
                AppError::from(ApplicationStoreError::NotFound(ApplicationId(
                    "MISSING000".to_string(),
                ))),
                StatusCode::NOT_FOUND,
            ),
            (
                AppError::from(ApplicationStoreError::Lifecycle(
                    LifecycleError::InvalidTransition {
                        from: ApplicationStatus::Approved,
                        to: ApplicationStatus::Pending,
                    },
                )),
                StatusCode::CONFLICT,
            ),
            (
                AppError::from(CatalogError::Validation("price".to_string())),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                AppError::from(std::io::Error::new(std::io::ErrorKind::Other, "disk")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.into_response().status(), expected);
        }
    }
}
