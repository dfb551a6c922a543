use axum::Router;
use axum::routing::{get, post};

use super::handlers::{device, quick_check, session};
use crate::service::AppContext;

/// Create the API router with all endpoints
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        // Device info and connection
        .route("/device/info", get(device::get_device_info))
        .route("/ports", get(device::list_ports))
        .route("/connect", post(device::connect))
        .route("/disconnect", post(device::disconnect))
        .route("/connection", get(device::get_connection))
        .route("/measure/once", post(device::measure_once))
        // Test configuration
        .route(
            "/config/time_mode",
            get(device::get_time_mode).post(device::set_time_mode),
        )
        .route(
            "/config/pressure",
            get(device::get_pressure).post(device::set_pressure),
        )
        // Timed leak test
        .route("/session/start", post(session::start_session))
        .route("/session/stop", post(session::stop_session))
        .route("/session/status", get(session::get_status))
        .route("/session/measure", post(session::measure_decide))
        // Quick check
        .route("/quick_check", get(quick_check::get_status))
        .route("/quick_check/start", post(quick_check::start))
        .route("/quick_check/step", post(quick_check::step))
        // Add state to all routes
        .with_state(ctx)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    use super::*;
    use crate::service::runner::tests::{CODE_65_KPA, ScriptedSource, fast_context};

    #[tokio::test]
    async fn test_device_info_route() {
        let app = create_router(fast_context(ScriptedSource::new(vec![], CODE_65_KPA)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/device/info")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_session_status_route() {
        let app = create_router(fast_context(ScriptedSource::new(vec![], CODE_65_KPA)));

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/session/status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_time_mode_route_rejects_invalid() {
        let app = create_router(fast_context(ScriptedSource::new(vec![], CODE_65_KPA)));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/config/time_mode")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"time_mode": 9}"#))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_measure_route_without_connection() {
        let mut source = ScriptedSource::new(vec![], CODE_65_KPA);
        source.connected = false;
        let app = create_router(fast_context(source));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/measure/once")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_connect_route_without_body() {
        let mut source = ScriptedSource::new(vec![], CODE_65_KPA);
        source.connected = false;
        let app = create_router(fast_context(source));

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/connect")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
