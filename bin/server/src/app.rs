//! HTTP router.

use axum::{
    Json, Router,
    routing::{get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::{auth, mail, realtime, state::AppState};

/// Builds the application router over shared state.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Auth routes
        .route("/auth/callback", get(auth::callback))
        .route("/auth/logout", get(auth::logout))
        .route("/auth/error", get(auth::auth_error))
        .route("/api/session", get(auth::session_info))
        // Realtime
        .route("/realtime/authorize", post(realtime::authorize))
        .route("/admin/notifications", post(realtime::create_notification))
        // Mail
        .route("/admin/mails/test", post(mail::send_test_mail))
        .route("/webhooks/mail/bounce", post(mail::bounce_webhook))
        .route("/webhooks/mail/complaint", post(mail::complaint_webhook))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppConfig, AuthConfig, MailConfig, RealtimeConfig, ServerConfig};
    use crate::mail::WEBHOOK_TOKEN_HEADER;
    use crate::state::Collaborators;
    use async_trait::async_trait;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use caby_core::UserId;
    use caby_mail::{
        BounceRecord, InMemorySuppressionStore, MailError, MailProvider, OutgoingMail,
        SuppressionStore,
    };
    use caby_platform_access::memory::{InMemoryAccountStore, InMemorySessionStore};
    use caby_platform_access::{
        AccessToken, AuthCodeConfig, AuthenticationError, IdentityResolver, Session,
        SessionStore, TokenEndpoint, TokenRequest, TokenResponse, User,
    };
    use caby_realtime::{RealtimeError, RealtimePublisher, TokenClaims};
    use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
    use rootcause::prelude::Report;
    use std::sync::Mutex;
    use tower::ServiceExt;

    const SECRET: &str = "router-test-secret";
    const WEBHOOK_TOKEN: &str = "hook-secret";

    #[derive(Default)]
    struct FakeTokenEndpoint {
        access_token: Option<String>,
        requests: Mutex<Vec<TokenRequest>>,
    }

    #[async_trait]
    impl TokenEndpoint for FakeTokenEndpoint {
        async fn exchange(
            &self,
            request: &TokenRequest,
        ) -> Result<TokenResponse, AuthenticationError> {
            self.requests.lock().expect("lock").push(request.clone());
            Ok(TokenResponse {
                access_token: self.access_token.clone(),
                ..TokenResponse::default()
            })
        }
    }

    struct FixedIdentity(Option<UserId>);

    #[async_trait]
    impl IdentityResolver for FixedIdentity {
        async fn resolve(
            &self,
            _token: &AccessToken,
        ) -> Result<Option<UserId>, AuthenticationError> {
            Ok(self.0)
        }
    }

    #[derive(Default)]
    struct FakeMailProvider {
        sent: Mutex<Vec<OutgoingMail>>,
    }

    #[async_trait]
    impl MailProvider for FakeMailProvider {
        async fn send(&self, mail: &OutgoingMail) -> Result<Option<String>, Report<MailError>> {
            self.sent.lock().expect("lock").push(mail.clone());
            Ok(Some("msg-1".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        published: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl RealtimePublisher for RecordingPublisher {
        async fn publish(
            &self,
            topic: &str,
            payload: Vec<u8>,
        ) -> Result<(), Report<RealtimeError>> {
            self.published
                .lock()
                .expect("lock")
                .push((topic.to_string(), payload));
            Ok(())
        }
    }

    struct Fixture {
        state: Arc<AppState>,
        tokens: Arc<FakeTokenEndpoint>,
        sessions: InMemorySessionStore,
        suppression: InMemorySuppressionStore,
        mail: Arc<FakeMailProvider>,
        publisher: Arc<RecordingPublisher>,
        user: User,
    }

    fn test_config() -> ServerConfig {
        ServerConfig {
            database_url: "postgres://unused".to_string(),
            listen_addr: "127.0.0.1:0".to_string(),
            app: AppConfig {
                name: "app".to_string(),
                stage: "dev".to_string(),
            },
            auth: AuthConfig {
                exchange: AuthCodeConfig::builder("https://auth.test/token".to_string())
                    .session_url("https://auth.test/session".to_string())
                    .build(),
                secure_cookies: false,
                cleanup_interval_seconds: 300,
                http_timeout_seconds: 10,
            },
            realtime: RealtimeConfig {
                token_secret: SECRET.to_string(),
                issuer: None,
                audience: None,
                nats_url: None,
            },
            mail: MailConfig {
                sender_domain: "caby.ch".to_string(),
                display_name: "Caby".to_string(),
                smtp: None,
                webhook_token: Some(WEBHOOK_TOKEN.to_string()),
            },
        }
    }

    async fn fixture(access_token: Option<&str>) -> Fixture {
        fixture_with_config(test_config(), access_token).await
    }

    async fn fixture_with_config(config: ServerConfig, access_token: Option<&str>) -> Fixture {
        let user = User::new("Alice".to_string(), "alice@caby.ch".to_string());
        let accounts = InMemoryAccountStore::new();
        accounts.insert_user(user.clone()).await;

        let tokens = Arc::new(FakeTokenEndpoint {
            access_token: access_token.map(str::to_string),
            ..FakeTokenEndpoint::default()
        });
        let sessions = InMemorySessionStore::new();
        let suppression = InMemorySuppressionStore::new();
        let mail = Arc::new(FakeMailProvider::default());
        let publisher = Arc::new(RecordingPublisher::default());

        let state = AppState::new(
            &config,
            Collaborators {
                token_endpoint: tokens.clone(),
                identity: Arc::new(FixedIdentity(Some(user.id()))),
                sessions: Arc::new(sessions.clone()),
                accounts: Arc::new(accounts),
                suppression: Arc::new(suppression.clone()),
                mail_provider: mail.clone(),
                publisher: Some(publisher.clone() as Arc<dyn RealtimePublisher>),
            },
        );

        Fixture {
            state: Arc::new(state),
            tokens,
            sessions,
            suppression,
            mail,
            publisher,
            user,
        }
    }

    impl Fixture {
        fn app(&self) -> Router {
            router(self.state.clone())
        }

        /// Stores a live session for the fixture user and returns its cookie header.
        async fn login(&self) -> String {
            let session = Session::new(
                self.user.id(),
                AccessToken::new("at_logged_in").expect("token"),
                None,
                chrono::Duration::hours(1),
            );
            self.sessions.create(&session).await.expect("create");
            "session=at_logged_in".to_string()
        }
    }

    fn jwt(sub: &str) -> String {
        let claims = TokenClaims {
            sub: sub.to_string(),
            exp: chrono::Utc::now().timestamp() + 300,
            iss: None,
            aud: None,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .expect("encode")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    async fn callback_sets_session_cookie_and_redirects_home() {
        let fx = fixture(Some("at_live")).await;

        let response = fx
            .app()
            .oneshot(
                Request::get("/auth/callback?code=abc")
                    .header(header::HOST, "caby.test")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        let cookie = response.headers()[header::SET_COOKIE]
            .to_str()
            .expect("ascii");
        assert!(cookie.starts_with("session=at_live"));
        assert!(cookie.contains("Max-Age=604800"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));

        let requests = fx.tokens.requests.lock().expect("lock").clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].code, "abc");
        assert_eq!(requests[0].redirect_uri, "http://caby.test/auth/callback");
        assert_eq!(fx.sessions.len().await, 1);
    }

    #[tokio::test]
    async fn callback_without_code_redirects_to_error() {
        let fx = fixture(Some("at_live")).await;

        let response = fx
            .app()
            .oneshot(
                Request::get("/auth/callback")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/error?error=missing_code"
        );
        assert!(fx.tokens.requests.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn callback_without_access_token_creates_no_session() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(
                Request::get("/auth/callback?code=abc")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response.headers()[header::LOCATION],
            "/auth/error?error=missing_access_token"
        );
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(fx.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn error_page_echoes_known_codes_only() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(
                Request::get("/auth/error?error=bogus")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&bytes[..], b"Authentication failed: unknown");
    }

    #[tokio::test]
    async fn error_page_echoes_invalid_token() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(
                Request::get("/auth/error?error=invalid_token")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&bytes[..], b"Authentication failed: invalid_token");
    }

    #[tokio::test]
    async fn session_endpoint_reports_user() {
        let fx = fixture(None).await;
        let cookie = fx.login().await;

        let response = fx
            .app()
            .oneshot(
                Request::get("/api/session")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["user"]["email"], "alice@caby.ch");
    }

    #[tokio::test]
    async fn session_endpoint_without_cookie_is_unauthorized() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(
                Request::get("/api/session")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn logout_ends_session() {
        let fx = fixture(None).await;
        let cookie = fx.login().await;

        let response = fx
            .app()
            .oneshot(
                Request::get("/auth/logout")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().get(header::SET_COOKIE).is_some());
        assert!(fx.sessions.is_empty().await);
    }

    #[tokio::test]
    async fn realtime_authorize_grants_prefixed_topics() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(
                Request::post("/realtime/authorize")
                    .header(header::AUTHORIZATION, format!("Bearer {}", jwt("driver-7")))
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let subscribe = body["subscribe"].as_array().expect("subscribe");
        let publish = body["publish"].as_array().expect("publish");
        assert!(!subscribe.is_empty());
        assert!(
            subscribe
                .iter()
                .chain(publish)
                .all(|t| t.as_str().is_some_and(|t| t.starts_with("app/dev/")))
        );
        assert!(subscribe.iter().any(|t| t == "app/dev/user/driver-7/#"));
    }

    #[tokio::test]
    async fn realtime_authorize_rejects_bad_token() {
        let fx = fixture(None).await;

        for auth in [None, Some("Bearer not-a-jwt")] {
            let mut request = Request::post("/realtime/authorize");
            if let Some(auth) = auth {
                request = request.header(header::AUTHORIZATION, auth);
            }
            let response = fx
                .app()
                .oneshot(request.body(Body::empty()).expect("request"))
                .await
                .expect("response");

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            let body = body_json(response).await;
            assert!(body.get("subscribe").is_none());
        }
    }

    #[tokio::test]
    async fn test_mail_to_bounced_address_is_not_sent() {
        let fx = fixture(None).await;
        let cookie = fx.login().await;
        fx.suppression
            .insert_bounce(&BounceRecord::new("gone@example.ch", "Permanent", "General"))
            .await
            .expect("insert");

        let response = fx
            .app()
            .oneshot(
                Request::post("/admin/mails/test")
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"to":"gone@example.ch"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body_json(response).await["sent"], false);
        assert!(fx.mail.sent.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn test_mail_is_sent_once_from_info() {
        let fx = fixture(None).await;
        let cookie = fx.login().await;

        let response = fx
            .app()
            .oneshot(
                Request::post("/admin/mails/test")
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"to":"bob@example.ch"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["sent"], true);
        let sent = fx.mail.sent.lock().expect("lock").clone();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].from, "info@caby.ch");
        assert_eq!(sent[0].subject, "test mail from dev stage");
    }

    #[tokio::test]
    async fn test_mail_requires_session() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(
                Request::post("/admin/mails/test")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"to":"bob@example.ch"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(fx.mail.sent.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn bounce_webhook_stores_records() {
        let fx = fixture(None).await;
        let message = json!({
            "notificationType": "Bounce",
            "bounce": {
                "bounceType": "Permanent",
                "bounceSubType": "NoEmail",
                "bouncedRecipients": [{ "emailAddress": "Gone@Example.ch" }]
            }
        });
        let body = json!({ "Records": [ { "Sns": { "Message": message.to_string() } } ] });

        let response = fx
            .app()
            .oneshot(
                Request::post("/webhooks/mail/bounce?token=hook-secret")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from(body.to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["created"], 1);
        let stored = fx
            .suppression
            .find_bounce("gone@example.ch")
            .await
            .expect("find")
            .expect("record");
        assert!(stored.enabled());
    }

    fn bounce_notification(address: &str) -> String {
        json!({
            "notificationType": "Bounce",
            "bounce": {
                "bounceType": "Permanent",
                "bounceSubType": "General",
                "bouncedRecipients": [{ "emailAddress": address }]
            }
        })
        .to_string()
    }

    #[tokio::test]
    async fn anonymous_bounce_webhook_stores_nothing() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(
                Request::post("/webhooks/mail/bounce")
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from(bounce_notification("victim@example.ch")))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fx.suppression.bounce_count().await, 0);

        let cookie = fx.login().await;
        let response = fx
            .app()
            .oneshot(
                Request::post("/admin/mails/test")
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"to":"victim@example.ch"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["sent"], true);
    }

    #[tokio::test]
    async fn webhook_with_wrong_token_is_rejected() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(
                Request::post("/webhooks/mail/bounce")
                    .header(WEBHOOK_TOKEN_HEADER, "guessed")
                    .body(Body::from(bounce_notification("victim@example.ch")))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fx.suppression.bounce_count().await, 0);
    }

    #[tokio::test]
    async fn webhook_refuses_everything_without_configured_token() {
        let mut config = test_config();
        config.mail.webhook_token = None;
        let fx = fixture_with_config(config, None).await;

        let response = fx
            .app()
            .oneshot(
                Request::post("/webhooks/mail/complaint?token=hook-secret")
                    .body(Body::from(r#"{"notificationType":"Complaint"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(fx.suppression.complaint_count().await, 0);
    }

    #[tokio::test]
    async fn complaint_webhook_rejects_garbage() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(
                Request::post("/webhooks/mail/complaint")
                    .header(WEBHOOK_TOKEN_HEADER, WEBHOOK_TOKEN)
                    .body(Body::from("{not json"))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(fx.suppression.complaint_count().await, 0);
    }

    #[tokio::test]
    async fn admin_notification_is_published() {
        let fx = fixture(None).await;
        let cookie = fx.login().await;

        let response = fx
            .app()
            .oneshot(
                Request::post("/admin/notifications")
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"title":"Maintenance","message":"Tonight"}"#))
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let published = fx.publisher.published.lock().expect("lock").clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "app/dev/systemnotification.created");
        let payload: Value = serde_json::from_slice(&published[0].1).expect("json");
        assert_eq!(payload["title"], "Maintenance");
    }

    #[tokio::test]
    async fn health_is_ok() {
        let fx = fixture(None).await;

        let response = fx
            .app()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
    }
}
