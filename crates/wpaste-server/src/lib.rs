//! HTTP server for wpaste.
//!
//! Exposes [`PasteService`](wpaste_core::PasteService) over plain HTTP forms
//! and maps its outcomes to status codes:
//!
//! | outcome            | status |
//! |--------------------|--------|
//! | validation failure | 400, 413 (too large), 422 (bad TTL) |
//! | not found          | 404    |
//! | expired            | 410    |
//! | bad or no secret   | 401    |
//! | name taken         | 409    |
//! | not a form body    | 415    |
//! | anything else      | 500    |
//!
//! [`WpasteServer`] also owns the background sweep and stops it on shutdown.

pub mod config;
pub mod error;
pub mod form;
pub mod handler;
pub mod router;
pub mod server;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use handler::AppState;
pub use server::{shutdown_signal, WpasteServer};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use chrono::Duration;
    use tower::util::ServiceExt;
    use wpaste_core::{PasteConfig, PasteService};
    use wpaste_crypto::HashParams;
    use wpaste_store::EntryStore;
    use wpaste_types::ManualClock;

    fn app_with(config: PasteConfig) -> (Router, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let service = PasteService::with_clock(
            Arc::new(EntryStore::in_memory()),
            PasteConfig {
                hash: HashParams::insecure_fast(),
                ..config
            },
            clock.clone(),
        )
        .unwrap();
        (router::build_router(AppState::new(Arc::new(service))), clock)
    }

    fn app() -> (Router, Arc<ManualClock>) {
        app_with(PasteConfig::default())
    }

    fn form(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn plain(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn help_endpoint() {
        let (app, _) = app();
        let (status, body) = send(&app, plain("GET", "/")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body.contains("POST /"));
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (app, _) = app();
        send(&app, form("POST", "/", "f=x")).await;
        let (status, body) = send(&app, plain("GET", "/-/health")).await;
        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["entries"], 1);
    }

    #[tokio::test]
    async fn create_then_read() {
        let (app, _) = app();
        let (status, name) = send(&app, form("POST", "/", "f=hello+world%21")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(name.len(), 3);

        let response = app.clone().oneshot(plain("GET", &format!("/{name}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; charset=utf-8"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"hello world!");
    }

    #[tokio::test]
    async fn binary_payload_round_trips_byte_for_byte() {
        let (app, _) = app();
        let (status, name) = send(&app, form("POST", "/", "f=%FF%FEab&name=bin&ep=s")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(name, "bin");

        let response = app.clone().oneshot(plain("GET", "/bin")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/octet-stream"
        );
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], &[0xFF, 0xFE, b'a', b'b'][..]);

        let (status, _) = send(&app, form("PUT", "/bin", "f=%00%80%FF&ep=s")).await;
        assert_eq!(status, StatusCode::OK);
        let response = app.clone().oneshot(plain("GET", "/bin")).await.unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], &[0x00, 0x80, 0xFF][..]);
    }

    #[tokio::test]
    async fn non_form_body_is_unsupported() {
        let (app, _) = app();
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{\"f\":\"x\"}"))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert!(body.starts_with("415"));
    }

    #[tokio::test]
    async fn create_with_name_and_conflict() {
        let (app, _) = app();
        let (status, name) = send(&app, form("POST", "/", "f=first&name=hello_world")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(name, "hello_world");

        let (status, _) = send(&app, form("POST", "/", "f=second&name=hello_world")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (_, body) = send(&app, plain("GET", "/hello_world")).await;
        assert_eq!(body, "first");
    }

    #[tokio::test]
    async fn create_rejections() {
        let (app, _) = app_with(PasteConfig {
            max_payload_bytes: 8,
            ..PasteConfig::default()
        });
        let cases = [
            ("name=x", StatusCode::BAD_REQUEST),
            ("f=", StatusCode::BAD_REQUEST),
            ("f=x&e=soon", StatusCode::UNPROCESSABLE_ENTITY),
            ("f=x&e=-3", StatusCode::BAD_REQUEST),
            ("f=x&name=..", StatusCode::BAD_REQUEST),
            ("f=123456789", StatusCode::PAYLOAD_TOO_LARGE),
        ];
        for (body, expected) in cases {
            let (status, _) = send(&app, form("POST", "/", body)).await;
            assert_eq!(status, expected, "body {body:?}");
        }
    }

    #[tokio::test]
    async fn read_statuses() {
        let (app, clock) = app();
        let (status, _) = send(&app, plain("GET", "/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        send(&app, form("POST", "/", "f=x&name=short&e=1")).await;
        clock.advance(Duration::seconds(2));
        let (status, body) = send(&app, plain("GET", "/short")).await;
        assert_eq!(status, StatusCode::GONE);
        assert!(body.starts_with("410"));
    }

    #[tokio::test]
    async fn access_secret_via_query() {
        let (app, _) = app();
        send(&app, form("POST", "/", "f=classified&name=s&ap=pw")).await;

        let (status, body) = send(&app, plain("GET", "/s")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (wrong_status, wrong_body) = send(&app, plain("GET", "/s?ap=nope")).await;
        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(body, wrong_body);

        let (status, body) = send(&app, plain("GET", "/s?ap=pw")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "classified");
    }

    #[tokio::test]
    async fn edit_via_put() {
        let (app, _) = app();
        send(&app, form("POST", "/", "f=X&name=doc&ep=s")).await;

        let (status, _) = send(&app, form("PUT", "/doc", "f=Y&ep=wrong")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (_, body) = send(&app, plain("GET", "/doc")).await;
        assert_eq!(body, "X");

        let (status, _) = send(&app, form("PUT", "/doc", "f=Y&ep=s")).await;
        assert_eq!(status, StatusCode::OK);
        let (_, body) = send(&app, plain("GET", "/doc")).await;
        assert_eq!(body, "Y");

        let (status, _) = send(&app, form("PUT", "/missing", "f=Y&ep=s")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn edit_without_edit_secret_is_refused() {
        let (app, _) = app();
        send(&app, form("POST", "/", "f=X&name=frozen")).await;
        let (status, _) = send(&app, form("PUT", "/frozen", "f=Y&ep=anything")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, plain("DELETE", "/frozen?ep=anything")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn delete_flow() {
        let (app, _) = app();
        send(&app, form("POST", "/", "f=X&name=tmp&ep=s")).await;

        let (status, _) = send(&app, plain("DELETE", "/tmp?ep=bad")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let (status, _) = send(&app, plain("DELETE", "/tmp?ep=s")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = send(&app, plain("GET", "/tmp")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, plain("DELETE", "/tmp?ep=s")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
