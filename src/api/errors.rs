//! HTTP status mapping for core errors

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use tracing::error;

use crate::error::Error;

pub const LOGIN_PAGE: &str = "/login";

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::UserNotFound
            | Error::KeyMismatch
            | Error::MissingTotp
            | Error::PasscodeRequired
            | Error::InvalidPasscode
            | Error::SessionNotFound
            | Error::SessionExpired
            | Error::InvalidTokenMethod
            | Error::InvalidTokenIssuer
            | Error::InvalidTokenClaims
            | Error::InvalidTokenAudience
            | Error::InvalidTokenSubject
            | Error::TokenExpired
            | Error::InvalidTokenSecret
            | Error::CodeNotFound
            | Error::CodeExpired
            | Error::CodeAlreadyUsed => StatusCode::UNAUTHORIZED,

            Error::NotFound(_) => StatusCode::NOT_FOUND,

            Error::InvalidUuid
            | Error::InvalidContent
            | Error::MissingTitle
            | Error::MissingParameter(_)
            | Error::InvalidParameter(_)
            | Error::InvalidOffset
            | Error::WeakPassword
            | Error::UserExists
            | Error::Json(_) => StatusCode::BAD_REQUEST,

            Error::AccessDenied => StatusCode::FORBIDDEN,
            Error::AccessDeniedRedirect => StatusCode::FOUND,

            Error::OffsetTooOld | Error::OffsetSame | Error::DuplicateFound => StatusCode::NO_CONTENT,

            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        match status {
            StatusCode::FOUND => HttpResponse::Found()
                .insert_header((header::LOCATION, LOGIN_PAGE))
                .finish(),
            StatusCode::NO_CONTENT => HttpResponse::NoContent().finish(),
            StatusCode::INTERNAL_SERVER_ERROR => {
                error!("request failed: {:#}", self);
                HttpResponse::InternalServerError().json(serde_json::json!({
                    "error": "internal server error"
                }))
            }
            _ => HttpResponse::build(status).json(serde_json::json!({
                "error": self.to_string()
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(Error::MissingTitle.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::InvalidUuid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::TokenExpired.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(Error::AccessDenied.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(Error::NotFound("movie").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(Error::OffsetSame.status_code(), StatusCode::NO_CONTENT);
        assert_eq!(
            Error::Other(anyhow::anyhow!("disk full")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_redirect_to_login() {
        let response = Error::AccessDeniedRedirect.error_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(header::LOCATION).unwrap(), LOGIN_PAGE);
    }
}
