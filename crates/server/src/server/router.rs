//! Axum router construction.

use axum::{
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::handlers::{self, accounts, auth, categories, households, reports, transactions};
use super::{middleware, state::AppState};
use crate::auth::require_session;

/// Build the application [`Router`] with all routes and middleware attached.
pub fn build(state: AppState) -> Router {
    let household = Router::new()
        .route("/households/:household_id/sync", get(households::sync))
        .route("/households/:household_id/members", get(households::members))
        .route(
            "/households/:household_id/members/:member_id",
            delete(households::remove_member),
        )
        .route(
            "/households/:household_id/invitations",
            post(households::create_invitation),
        )
        .route(
            "/households/:household_id/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/households/:household_id/categories/:id",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route(
            "/households/:household_id/categories/:id/suggested-notes",
            get(categories::suggested_notes),
        )
        .route(
            "/households/:household_id/accounts",
            get(accounts::list_accounts).post(accounts::create_account),
        )
        .route(
            "/households/:household_id/accounts/:id",
            put(accounts::update_account).delete(accounts::delete_account),
        )
        .route(
            "/households/:household_id/transactions",
            get(transactions::list_transactions).post(transactions::create_transaction),
        )
        .route(
            "/households/:household_id/transactions/:id",
            put(transactions::update_transaction).delete(transactions::delete_transaction),
        )
        .route("/households/:household_id/summary/:month", get(reports::summary))
        .route(
            "/households/:household_id/recommendations",
            get(reports::recommendations),
        )
        .route_layer(from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/health", get(handlers::health))
        .route("/auth/google", post(auth::google_login))
        .route("/auth/test-login", post(auth::test_login))
        .route("/households", post(households::create_household))
        .merge(household)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .layer(middleware::cors_layer())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::auth::{GoogleIdentity, MockIdentityVerifier, TokenSigner, VerifyError, TEST_MODE_TOKEN};
    use crate::crypto::Crypto;
    use crate::db::{Database, Repository};
    use crate::mailer::LogMailer;
    use crate::models::{Household, User};

    const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
    const SECRET: &str = "router-test-secret";

    fn state_with(verifier: MockIdentityVerifier) -> AppState {
        let repo = Repository::new(
            Database::open_in_memory().unwrap(),
            Crypto::from_hex(TEST_KEY).unwrap(),
        );
        AppState::new(
            repo,
            TokenSigner::new(SECRET),
            Arc::new(verifier),
            Arc::new(LogMailer::new("noreply@keda.local", "http://localhost:8080")),
        )
    }

    fn state() -> AppState {
        state_with(MockIdentityVerifier::new())
    }

    async fn json_body(resp: Response) -> Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_with(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        req.body(Body::from(body.to_string())).unwrap()
    }

    /// Household `hh-1` with member `u-1`, and a token for them.
    async fn member(state: &AppState) -> String {
        let repo = &state.repo;
        repo.create_household(&mut Household::new("hh-1", "Casa")).await.unwrap();
        let mut user = User::new(repo.crypto(), "u-1", "hh-1", "ana@example.com", "Ana").unwrap();
        repo.insert(&mut user).await.unwrap();
        state.tokens.issue("u-1", "hh-1").unwrap()
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(state());
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(resp).await["code"], "not_found");
    }

    #[tokio::test]
    async fn health_route_exists() {
        let app = build(state());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["status"], "ok");
    }

    #[tokio::test]
    async fn household_routes_require_authorization_header() {
        let app = build(state());
        let req = Request::builder()
            .uri("/households/hh-1/accounts")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "Authorization header required");
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_rejected() {
        let app = build(state());
        let req = Request::builder()
            .uri("/households/hh-1/accounts")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "Invalid authorization format");
    }

    #[tokio::test]
    async fn forged_token_is_rejected() {
        let app = build(state());
        let forged = TokenSigner::new("other-secret").issue("u-1", "hh-1").unwrap();
        let resp = app.oneshot(get_with("/households/hh-1/accounts", &forged)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn other_household_is_forbidden() {
        let state = state();
        let token = member(&state).await;
        let app = build(state);
        let resp = app.oneshot(get_with("/households/hh-2/accounts", &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(resp).await["message"], "Access denied to this household");
    }

    #[tokio::test]
    async fn removed_user_loses_access() {
        let state = state();
        let token = member(&state).await;
        state.repo.soft_delete::<User>("hh-1", "u-1").await.unwrap();
        let app = build(state);
        let resp = app.oneshot(get_with("/households/hh-1/accounts", &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn user_moved_to_another_household_is_forbidden() {
        let state = state();
        let token = member(&state).await;
        let mut user: User = state.repo.find("u-1").await.unwrap().unwrap();
        user.household_id = "hh-2".into();
        state.repo.update(&mut user).await.unwrap();

        let app = build(state);
        let resp = app.oneshot(get_with("/households/hh-1/accounts", &token)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_mode_token_only_works_in_test_mode() {
        let app = build(state());
        let resp = app
            .oneshot(get_with("/households/test-household-id/accounts", TEST_MODE_TOKEN))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let app = build(state().with_test_mode("test-household-id"));
        let resp = app
            .oneshot(get_with("/households/test-household-id/accounts", TEST_MODE_TOKEN))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn malformed_json_is_a_json_400() {
        let state = state();
        let token = member(&state).await;
        let app = build(state);
        let req = Request::builder()
            .method("POST")
            .uri("/households/hh-1/categories")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .body(Body::from("{not json"))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["code"], "bad_request");
    }

    #[tokio::test]
    async fn bad_month_is_rejected() {
        let state = state();
        let token = member(&state).await;
        let app = build(state);
        let resp = app
            .oneshot(get_with("/households/hh-1/transactions?month=2024-13", &token))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["message"], "Invalid month format. Use YYYY-MM");
    }

    #[tokio::test]
    async fn google_login_creates_user_and_household() {
        let mut verifier = MockIdentityVerifier::new();
        verifier.expect_verify_id_token().returning(|_| {
            Ok(GoogleIdentity {
                subject: "g-1".into(),
                email: "new@example.com".into(),
                name: "Nuevo".into(),
                picture: "https://pic".into(),
            })
        });
        let state = state_with(verifier);
        let app = build(state.clone());

        let resp = app
            .oneshot(post_json("/auth/google", None, json!({"id_token": "tok"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["user"]["email"], "new@example.com");
        let household_id = body["household_id"].as_str().unwrap().to_owned();

        let claims = state.tokens.verify(body["token"].as_str().unwrap()).unwrap();
        assert_eq!(claims.household_id, household_id);
        let household: Household = state.repo.find(&household_id).await.unwrap().unwrap();
        assert_eq!(household.name.as_str(), "Nuevo's Household");
        assert_eq!(state.repo.count_cash_accounts(&household_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn rejected_access_token_is_401() {
        let mut verifier = MockIdentityVerifier::new();
        verifier
            .expect_verify_access_token()
            .returning(|_| Err(VerifyError::Rejected));
        let app = build(state_with(verifier));
        let resp = app
            .oneshot(post_json("/auth/google", None, json!({"access_token": "bad"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "Invalid Google access token");
    }

    #[tokio::test]
    async fn login_without_tokens_is_401() {
        let app = build(state());
        let resp = app
            .oneshot(post_json("/auth/google", None, json!({})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["message"], "No valid token provided");
    }

    #[tokio::test]
    async fn test_login_is_disabled_outside_test_mode() {
        let app = build(state());
        let resp = app
            .oneshot(post_json(
                "/auth/test-login",
                None,
                json!({"email": "demo@keda.app", "name": "Demo"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn cors_preflight_is_answered() {
        let app = build(state());
        let req = Request::builder()
            .method("OPTIONS")
            .uri("/households/hh-1/accounts")
            .header(header::ORIGIN, "http://localhost:8080")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "*"
        );
    }
}
