//! End-to-end tests over the full router.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header::AUTHORIZATION, HeaderValue, StatusCode};
use axum_test::{TestRequest, TestServer};
use mockall::mock;
use serde_json::{json, Value};

use keda_server::auth::{GoogleIdentity, IdentityVerifier, TokenSigner, VerifyError};
use keda_server::crypto::Crypto;
use keda_server::db::{rows::CategoryRow, Database, Repository};
use keda_server::mailer::{MailError, Mailer};
use keda_server::models::User;
use keda_server::server::{router, state::AppState};

const TEST_KEY: &str = "0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef";
const TEST_HOUSEHOLD: &str = "test-household-id";

mock! {
    Verifier {}

    #[async_trait]
    impl IdentityVerifier for Verifier {
        async fn verify_id_token(&self, id_token: &str) -> Result<GoogleIdentity, VerifyError>;
        async fn verify_access_token(&self, access_token: &str) -> Result<GoogleIdentity, VerifyError>;
    }
}

/// Captures `(to, code)` of every invitation sent.
#[derive(Default, Clone)]
struct RecordingMailer {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_invitation(&self, to: &str, code: &str) -> Result<(), MailError> {
        self.sent.lock().unwrap().push((to.to_owned(), code.to_owned()));
        Ok(())
    }
}

struct Harness {
    server: TestServer,
    state: AppState,
    mailer: RecordingMailer,
}

fn harness_with(verifier: MockVerifier) -> Harness {
    let repo = Repository::new(
        Database::open_in_memory().unwrap(),
        Crypto::from_hex(TEST_KEY).unwrap(),
    );
    let mailer = RecordingMailer::default();
    let state = AppState::new(
        repo,
        TokenSigner::new("api-test-secret"),
        Arc::new(verifier),
        Arc::new(mailer.clone()),
    )
    .with_test_mode(TEST_HOUSEHOLD);
    let server = TestServer::new(router::build(state.clone())).unwrap();
    Harness {
        server,
        state,
        mailer,
    }
}

fn harness() -> Harness {
    harness_with(MockVerifier::new())
}

fn bearer(req: TestRequest, token: &str) -> TestRequest {
    req.add_header(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
    )
}

/// Log in through `/auth/test-login`; returns `(token, household_id, user_id)`.
async fn login(h: &Harness, email: &str, name: &str, invite_code: &str) -> (String, String, String) {
    let resp = h
        .server
        .post("/auth/test-login")
        .json(&json!({"email": email, "name": name, "invite_code": invite_code}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let body: Value = resp.json();
    (
        body["token"].as_str().unwrap().to_owned(),
        body["household_id"].as_str().unwrap().to_owned(),
        body["user"]["id"].as_str().unwrap().to_owned(),
    )
}

async fn wait_for_mail(mailer: &RecordingMailer) -> Vec<(String, String)> {
    for _ in 0..50 {
        let sent = mailer.sent.lock().unwrap().clone();
        if !sent.is_empty() {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Vec::new()
}

#[tokio::test]
async fn test_login_matches_email_case_insensitively() {
    let h = harness();
    let (_, household, user) = login(&h, "ana@example.com", "Ana", "").await;
    let (_, household_again, user_again) = login(&h, "  ANA@Example.com", "Ana", "").await;
    assert_eq!(user, user_again);
    assert_eq!(household, household_again);
}

#[tokio::test]
async fn new_household_has_exactly_one_cash_account() {
    let h = harness();
    let (token, hh, _) = login(&h, "ana@example.com", "Ana", "").await;
    let base = format!("/households/{hh}/accounts");

    let accounts: Value = bearer(h.server.get(&base), &token).await.json();
    let accounts = accounts.as_array().unwrap();
    assert_eq!(accounts.len(), 1);
    assert_eq!(accounts[0]["type"], "cash");
    let cash_id = accounts[0]["id"].as_str().unwrap().to_owned();

    let resp = bearer(h.server.post(&base), &token)
        .json(&json!({"type": "cash", "name": "Other cash"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = bearer(h.server.put(&format!("{base}/{cash_id}")), &token)
        .json(&json!({"type": "bank", "name": "Renamed"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::FORBIDDEN);

    let resp = bearer(h.server.delete(&format!("{base}/{cash_id}")), &token).await;
    assert_eq!(resp.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn card_accounts_can_be_edited_and_deleted() {
    let h = harness();
    let (token, hh, _) = login(&h, "ana@example.com", "Ana", "").await;
    let base = format!("/households/{hh}/accounts");

    let resp = bearer(h.server.post(&base), &token)
        .json(&json!({"id": "acc-visa", "type": "card", "brand": "Visa", "bank": "ACME"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    assert_eq!(resp.json::<Value>()["display_name"], "Visa - ACME");

    let resp = bearer(h.server.put(&format!("{base}/acc-visa")), &token)
        .json(&json!({"type": "card", "brand": "Mastercard"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(resp.json::<Value>()["display_name"], "Mastercard");

    let resp = bearer(h.server.delete(&format!("{base}/acc-visa")), &token).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let resp = bearer(h.server.delete(&format!("{base}/acc-visa")), &token).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn categories_are_stored_encrypted() {
    let h = harness();
    let (token, hh, _) = login(&h, "ana@example.com", "Ana", "").await;

    let resp = bearer(h.server.post(&format!("/households/{hh}/categories")), &token)
        .json(&json!({"id": "cat-food", "name": "Comida", "monthly_budget": 300.0}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    assert_eq!(resp.json::<Value>()["name"], "Comida");

    let row: CategoryRow = h.state.repo.database().get("cat-food").unwrap().unwrap();
    assert!(row.name.starts_with("enc:"));
    assert_ne!(row.name, "Comida");
}

#[tokio::test]
async fn transactions_are_filtered_by_month_and_carry_author() {
    let h = harness();
    let (token, hh, user) = login(&h, "ana@example.com", "Ana", "").await;
    let base = format!("/households/{hh}/transactions");

    for (id, date) in [("tx-feb", "2024-02-28T23:00:00Z"), ("tx-mar", "2024-03-01T08:00:00Z")] {
        let resp = bearer(h.server.post(&base), &token)
            .json(&json!({
                "id": id,
                "account_id": "acc-1",
                "category_id": "cat-1",
                "amount": 10.0,
                "date": date,
                "note": "Pan"
            }))
            .await;
        assert_eq!(resp.status_code(), StatusCode::CREATED);
        let body: Value = resp.json();
        assert_eq!(body["user_id"], user.as_str());
        assert_eq!(body["user"]["name"], "Ana");
    }

    let march: Value = bearer(h.server.get(&base).add_query_param("month", "2024-03"), &token)
        .await
        .json();
    let march = march.as_array().unwrap();
    assert_eq!(march.len(), 1);
    assert_eq!(march[0]["id"], "tx-mar");

    let all: Value = bearer(h.server.get(&base), &token).await.json();
    assert_eq!(all.as_array().unwrap().len(), 2);
    assert_eq!(all[0]["id"], "tx-mar");

    let resp = bearer(h.server.get(&base).add_query_param("month", "March"), &token).await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn summary_reports_spent_and_remaining() {
    let h = harness();
    let (token, hh, _) = login(&h, "ana@example.com", "Ana", "").await;

    bearer(h.server.post(&format!("/households/{hh}/categories")), &token)
        .json(&json!({"id": "cat-food", "name": "Food", "monthly_budget": 100.0}))
        .await;
    for (amount, date) in [(40.0, "2024-03-05T10:00:00Z"), (12.5, "2024-03-20T10:00:00Z"), (99.0, "2024-04-01T00:00:00Z")] {
        bearer(h.server.post(&format!("/households/{hh}/transactions")), &token)
            .json(&json!({
                "account_id": "acc-1",
                "category_id": "cat-food",
                "amount": amount,
                "date": date
            }))
            .await;
    }

    let resp = bearer(h.server.get(&format!("/households/{hh}/summary/2024-03")), &token).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["month"], "2024-03");
    assert_eq!(body["total_budget"], 100.0);
    assert_eq!(body["total_spent"], 52.5);
    assert_eq!(body["categories"][0]["name"], "Food");
    assert_eq!(body["categories"][0]["remaining"], 47.5);

    let resp = bearer(h.server.get(&format!("/households/{hh}/summary/2024-3")), &token).await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn suggested_notes_group_case_variants() {
    let h = harness();
    let (token, hh, _) = login(&h, "ana@example.com", "Ana", "").await;

    for (note, date) in [("Pan", "2024-03-01T10:00:00Z"), ("pan ", "2024-03-02T10:00:00Z"), ("Leche", "2024-03-03T10:00:00Z")] {
        bearer(h.server.post(&format!("/households/{hh}/transactions")), &token)
            .json(&json!({
                "account_id": "acc-1",
                "category_id": "cat-food",
                "amount": 1.0,
                "date": date,
                "note": note
            }))
            .await;
    }

    let notes: Vec<String> = bearer(
        h.server.get(&format!("/households/{hh}/categories/cat-food/suggested-notes")),
        &token,
    )
    .await
    .json();
    assert_eq!(notes.len(), 2);
    assert_eq!(notes[0], "Leche");
}

#[tokio::test]
async fn invitation_flow_adds_member_to_household() {
    let h = harness();
    let (token, hh, _) = login(&h, "ana@example.com", "Ana", "").await;
    let invitations = format!("/households/{hh}/invitations");

    let resp = bearer(h.server.post(&invitations), &token)
        .json(&json!({"email": "not-an-email"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::BAD_REQUEST);

    let resp = bearer(h.server.post(&invitations), &token)
        .json(&json!({"email": "bob@example.com"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    let code = resp.json::<Value>()["code"].as_str().unwrap().to_owned();
    assert_eq!(code.len(), 6);

    let resp = bearer(h.server.post(&invitations), &token)
        .json(&json!({"email": "BOB@example.com "}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CONFLICT);

    let sent = wait_for_mail(&h.mailer).await;
    assert_eq!(sent, vec![("bob@example.com".to_owned(), code.clone())]);

    let members: Value = bearer(h.server.get(&format!("/households/{hh}/members")), &token)
        .await
        .json();
    let pending: Vec<&Value> = members
        .as_array()
        .unwrap()
        .iter()
        .filter(|m| m["status"] == "pending")
        .collect();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["name"], "Invitado");

    let (_, bob_household, bob_id) = login(&h, "bob@example.com", "Bob", &code.to_uppercase()).await;
    assert_eq!(bob_household, hh);

    let members: Value = bearer(h.server.get(&format!("/households/{hh}/members")), &token)
        .await
        .json();
    let members = members.as_array().unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m["status"] == "active"));

    let resp = bearer(h.server.delete(&format!("/households/{hh}/members/{bob_id}")), &token).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let resp = bearer(h.server.delete(&format!("/households/{hh}/members/nobody")), &token).await;
    assert_eq!(resp.status_code(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn removed_member_cannot_log_back_in() {
    let h = harness();
    let (_, hh, user) = login(&h, "ana@example.com", "Ana", "").await;
    h.state.repo.soft_delete::<User>(&hh, &user).await.unwrap();

    let resp = h
        .server
        .post("/auth/test-login")
        .json(&json!({"email": "ana@example.com", "name": "Ana"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn google_login_falls_back_to_access_token() {
    let mut verifier = MockVerifier::new();
    verifier
        .expect_verify_id_token()
        .returning(|_| Err(VerifyError::Rejected));
    verifier.expect_verify_access_token().returning(|_| {
        Ok(GoogleIdentity {
            subject: "g-42".into(),
            email: "web@example.com".into(),
            name: "Web".into(),
            picture: "https://pic/web".into(),
        })
    });
    let h = harness_with(verifier);

    let resp = h
        .server
        .post("/auth/google")
        .json(&json!({"id_token": "stale", "access_token": "fresh"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    let body: Value = resp.json();
    assert_eq!(body["user"]["picture_url"], "https://pic/web");

    let user = h
        .state
        .repo
        .find_user_by_email("web@example.com", false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(user.google_id, "g-42");
    assert!(!user.color.is_empty());
}

#[tokio::test]
async fn public_household_creation_returns_201() {
    let h = harness();
    let resp = h
        .server
        .post("/households")
        .json(&json!({"id": "hh-new", "name": "Piso"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CREATED);
    assert_eq!(h.state.repo.count_cash_accounts("hh-new").await.unwrap(), 1);

    let resp = h
        .server
        .post("/households")
        .json(&json!({"id": "hh-new", "name": "Piso"}))
        .await;
    assert_eq!(resp.status_code(), StatusCode::CONFLICT);
}
