use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
    body::Body,
};
use sha2::{Digest, Sha256};

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_config::AppConfig;

use crate::jwt::validate_token;

// Validates the Supabase JWT and stores the caller in the request extensions
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    let token = auth_value
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Auth("Invalid authorization header format".to_string()))?;

    let user = validate_token(token, &config.supabase_jwt_secret)
        .map_err(AppError::Auth)?;

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Administrator role required".to_string()))
    }
}

/// Checks a shared-secret header used by machine callers (cron trigger, bot webhook).
/// An empty configured secret never matches.
pub fn require_shared_secret(headers: &HeaderMap, header_name: &str, expected: &str) -> Result<(), AppError> {
    let provided = headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Auth(format!("Missing {} header", header_name)))?;

    if secret_matches(provided, expected) {
        Ok(())
    } else {
        Err(AppError::Auth(format!("Invalid {} header", header_name)))
    }
}

fn secret_matches(provided: &str, expected: &str) -> bool {
    if expected.is_empty() {
        return false;
    }
    // compare digests so the comparison time does not depend on the common prefix
    Sha256::digest(provided.as_bytes()) == Sha256::digest(expected.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use axum::http::HeaderValue;

    #[test]
    fn shared_secret_must_match() {
        let mut headers = HeaderMap::new();
        headers.insert("x-trigger-secret", HeaderValue::from_static("s3cret"));

        assert!(require_shared_secret(&headers, "x-trigger-secret", "s3cret").is_ok());
        assert_matches!(
            require_shared_secret(&headers, "x-trigger-secret", "other"),
            Err(AppError::Auth(_))
        );
        assert_matches!(
            require_shared_secret(&HeaderMap::new(), "x-trigger-secret", "s3cret"),
            Err(AppError::Auth(_))
        );
    }

    #[test]
    fn empty_expected_secret_never_matches() {
        assert!(!secret_matches("", ""));
    }

    #[test]
    fn admin_check_uses_role() {
        let mut user = User {
            id: "u1".to_string(),
            email: None,
            role: Some("employee".to_string()),
            metadata: None,
            created_at: None,
        };
        assert_matches!(require_admin(&user), Err(AppError::Forbidden(_)));

        user.role = Some("admin".to_string());
        assert!(require_admin(&user).is_ok());
    }

    #[tokio::test]
    async fn middleware_exposes_the_caller() {
        use axum::{extract::Extension, http::StatusCode, middleware, routing::get, Router};
        use tower::ServiceExt;

        use crate::test_utils::{JwtTestUtils, TestConfig, TestUser};

        let config = TestConfig::default();
        let caller = TestUser::admin("admin@example.com");
        let token = JwtTestUtils::create_test_token(&caller, &config.jwt_secret, None);

        let app = Router::new()
            .route("/", get(|Extension(user): Extension<User>| async move { user.id }))
            .layer(middleware::from_fn_with_state(config.to_arc(), auth_middleware));

        let response = app
            .clone()
            .oneshot(
                Request::get("/")
                    .header("Authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
