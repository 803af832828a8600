/// HTTP middleware utilities for feed-service
///
/// Authentication is terminated at the gateway, which forwards the numeric
/// user id in the `x-user-id` header. These extractors surface that identity
/// to handlers: optional for reads, required for mutations.
use actix_web::{FromRequest, HttpRequest};
use std::future::{ready, Ready};

use crate::error::AppError;

pub const USER_ID_HEADER: &str = "x-user-id";

/// Optional viewer identity. Absent header means an anonymous request;
/// a present-but-malformed header is rejected rather than silently dropped.
#[derive(Debug, Clone, Copy)]
pub struct Viewer(pub Option<i64>);

/// Viewer identity required for mutating endpoints.
#[derive(Debug, Clone, Copy)]
pub struct RequiredViewer(pub i64);

fn viewer_from_request(req: &HttpRequest) -> Result<Option<i64>, AppError> {
    match req.headers().get(USER_ID_HEADER) {
        None => Ok(None),
        Some(value) => {
            let raw = value
                .to_str()
                .map_err(|_| AppError::Unauthorized("Invalid x-user-id header".to_string()))?;
            let id: i64 = raw
                .parse()
                .map_err(|_| AppError::Unauthorized("Invalid x-user-id header".to_string()))?;
            if id < 1 {
                return Err(AppError::Unauthorized(
                    "Invalid x-user-id header".to_string(),
                ));
            }
            Ok(Some(id))
        }
    }
}

impl FromRequest for Viewer {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(viewer_from_request(req).map(Viewer))
    }
}

impl FromRequest for RequiredViewer {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut actix_web::dev::Payload) -> Self::Future {
        ready(viewer_from_request(req).and_then(|viewer| {
            viewer.map(RequiredViewer).ok_or_else(|| {
                AppError::Unauthorized("Missing x-user-id header".to_string())
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    #[test]
    fn test_absent_header_is_anonymous() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(viewer_from_request(&req), Ok(None)));
    }

    #[test]
    fn test_valid_header_parses() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "42"))
            .to_http_request();
        assert!(matches!(viewer_from_request(&req), Ok(Some(42))));
    }

    #[test]
    fn test_malformed_header_rejected() {
        for bad in ["abc", "-1", "0", "1.5"] {
            let req = TestRequest::default()
                .insert_header((USER_ID_HEADER, bad))
                .to_http_request();
            assert!(viewer_from_request(&req).is_err(), "{} should fail", bad);
        }
    }
}
