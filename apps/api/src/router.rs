use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::{
    appointment_routes, blocked_time_routes, booking_routes, recipient_routes, reminder_routes,
    ChangeFeed,
};
use bot_cell::bot_routes;
use contract_cell::contract_routes;
use shared_config::AppConfig;
use sms_activation_cell::sms_request_routes;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // One feed per process: every writer publishes into it, every admin
    // dashboard subscribes to it.
    let feed = ChangeFeed::new();

    Router::new()
        .route("/", get(|| async { "Agency portal API is running!" }))
        .nest("/booking", booking_routes(state.clone(), feed.clone()))
        .nest("/recipients", recipient_routes(state.clone()))
        .nest("/appointments", appointment_routes(state.clone(), feed.clone()))
        .nest("/blocked-times", blocked_time_routes(state.clone(), feed))
        .nest("/reminders", reminder_routes(state.clone()))
        .nest("/contracts", contract_routes(state.clone()))
        .nest("/sms-requests", sms_request_routes(state.clone()))
        .nest("/bot", bot_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;
    use shared_utils::test_utils::TestConfig;

    #[tokio::test]
    async fn liveness_route_answers() {
        let app = create_router(TestConfig::default().to_arc());

        let response = app
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn admin_routes_require_a_token() {
        let app = create_router(TestConfig::default().to_arc());

        for uri in ["/recipients", "/appointments", "/blocked-times", "/contracts", "/sms-requests"] {
            let response = app
                .clone()
                .oneshot(Request::get(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
        }
    }
}
