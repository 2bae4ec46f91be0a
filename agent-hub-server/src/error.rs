use agent_hub_shared::{ErrorDetail, ValidationErrorBody, ValidationIssue};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HubError {
    #[error("{0}")]
    Validation(String),

    #[error("OPENROUTER_API_KEY is not set in the environment")]
    MissingCredential,

    #[error("{0}")]
    Upstream(String),
}

impl HubError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        HubError::Upstream(err.to_string())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            HubError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            HubError::MissingCredential | HubError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Validation(err.to_string())
    }
}

impl IntoResponse for HubError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            HubError::Validation(message) => {
                let body = ValidationErrorBody {
                    detail: vec![ValidationIssue {
                        kind: "value_error".to_string(),
                        msg: message,
                    }],
                };
                (status, Json(body)).into_response()
            }
            other => (
                status,
                Json(ErrorDetail {
                    detail: other.to_string(),
                }),
            )
                .into_response(),
        }
    }
}
