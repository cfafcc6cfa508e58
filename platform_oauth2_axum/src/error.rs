use http::StatusCode;
use platform_oauth2::{CoordinationError, OAuth2Error};

/// Helper trait for converting errors to a standard response error format
pub trait IntoResponseError<T> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)>;
}

impl<T> IntoResponseError<T> for Result<T, CoordinationError> {
    fn into_response_error(self) -> Result<T, (StatusCode, String)> {
        self.map_err(|e| {
            let status = match &e {
                CoordinationError::OAuth2Error(err) => oauth2_status(err),
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            (status, e.to_string())
        })
    }
}

/// Status code for a failed OAuth2 operation.
pub(crate) fn oauth2_status(err: &OAuth2Error) -> StatusCode {
    match err {
        OAuth2Error::UnknownProvider(_)
        | OAuth2Error::MissingParameter(_)
        | OAuth2Error::InvalidOrExpiredState
        | OAuth2Error::AuthorizationDenied { .. } => StatusCode::BAD_REQUEST,
        OAuth2Error::RefreshFailed(_) => StatusCode::UNAUTHORIZED,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
