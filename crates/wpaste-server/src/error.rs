use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use wpaste_core::{PasteError, ValidationError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Paste(#[from] PasteError),

    #[error("store error: {0}")]
    Store(#[from] wpaste_store::StoreError),

    #[error("expected an application/x-www-form-urlencoded body, got {0:?}")]
    UnsupportedMediaType(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type ServerResult<T> = Result<T, ServerError>;

impl From<ValidationError> for ServerError {
    fn from(e: ValidationError) -> Self {
        Self::Paste(e.into())
    }
}

impl ServerError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Paste(e) => match e {
                PasteError::Validation(v) => match v {
                    ValidationError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
                    ValidationError::MalformedTtl(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    ValidationError::MissingPayload
                    | ValidationError::NegativeTtl(_)
                    | ValidationError::InvalidName(_) => StatusCode::BAD_REQUEST,
                },
                PasteError::NotFound(_) => StatusCode::NOT_FOUND,
                PasteError::Gone(_) => StatusCode::GONE,
                PasteError::Unauthorized => StatusCode::UNAUTHORIZED,
                PasteError::Conflict(_) => StatusCode::CONFLICT,
                PasteError::NamespaceExhausted { .. }
                | PasteError::Credential(_)
                | PasteError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Store(_) | Self::Config(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Response body text. Internal failures get a generic message.
    fn public_message(&self) -> String {
        match self.status_code() {
            StatusCode::INTERNAL_SERVER_ERROR => "something bad happened".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(status = status.as_u16(), error = %self, "request rejected");
        }
        let body = format!("{} - {}\n", status.as_u16(), self.public_message());
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(e: impl Into<ServerError>) -> StatusCode {
        e.into().status_code()
    }

    #[test]
    fn validation_statuses() {
        assert_eq!(status(ValidationError::MissingPayload), StatusCode::BAD_REQUEST);
        assert_eq!(status(ValidationError::NegativeTtl(-1)), StatusCode::BAD_REQUEST);
        assert_eq!(
            status(ValidationError::MalformedTtl("x".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status(ValidationError::PayloadTooLarge { size: 2, max: 1 }),
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }

    #[test]
    fn lookup_statuses() {
        assert_eq!(status(PasteError::NotFound("a".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(PasteError::Gone("a".into())), StatusCode::GONE);
        assert_eq!(status(PasteError::Unauthorized), StatusCode::UNAUTHORIZED);
        assert_eq!(status(PasteError::Conflict("a".into())), StatusCode::CONFLICT);
    }

    #[test]
    fn internal_errors_are_opaque() {
        let err = ServerError::Internal("disk on fire".into());
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "something bad happened");

        let err: ServerError = PasteError::NamespaceExhausted { attempts: 3 }.into();
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unauthorized_message_is_uniform() {
        assert_eq!(
            ServerError::from(PasteError::Unauthorized).public_message(),
            "unauthorized"
        );
    }
}
