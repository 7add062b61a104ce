//! In-process fake of the storefront backend.
//!
//! Cookie session, anti-forgery header check on every mutating route, and
//! the LGPD endpoints, all held in one locked struct the tests can inspect.

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use parking_lot::Mutex;
use serde_json::{Value, json};
use url::Url;

use storefront_session::{ClientConfig, NoticeQueue, Storefront};

pub const USERNAME: &str = "ana@example.com";
pub const PASSWORD: &str = "s3nha-forte";
pub const EMAIL_TOKEN: &str = "link-token";
const SESSION_COOKIE: &str = "sid";
const SESSION_ID: &str = "session-1";
const CREATED_AT: &str = "2025-03-01T12:00:00Z";

#[derive(Debug, Default)]
pub struct FakeState {
    pub issued: u64,
    pub token: Option<String>,
    pub signed_in: bool,
    pub marketing: bool,
    pub terms: bool,
    pub privacy: bool,
    pub history: Vec<Value>,
    pub exports: Vec<Value>,
    pub removed: Option<String>,
    /// `(path, anti-forgery header)` for every request, in arrival order.
    pub requests: Vec<(String, Option<String>)>,
}

type Shared = Arc<Mutex<FakeState>>;

pub struct FakeServer {
    pub base_url: Url,
    pub state: Shared,
}

impl FakeServer {
    pub fn paths(&self) -> Vec<String> {
        self.state
            .lock()
            .requests
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    pub fn header_for(&self, path: &str) -> Option<String> {
        self.state
            .lock()
            .requests
            .iter()
            .rev()
            .find(|(p, _)| p == path)
            .and_then(|(_, header)| header.clone())
    }

    pub fn storefront(&self) -> (Storefront<storefront_session::HttpBackend>, NoticeQueue) {
        let notices = NoticeQueue::new();
        let storefront = Storefront::connect(ClientConfig::new(self.base_url.clone()), notices.clone())
            .expect("build storefront");
        (storefront, notices)
    }
}

pub async fn spawn() -> FakeServer {
    let state: Shared = Arc::new(Mutex::new(FakeState::default()));

    let app = Router::new()
        .route("/api/auth/csrf-token", get(csrf_token))
        .route("/api/auth/me", get(me))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
        .route("/api/auth/verify-email", get(verify_email))
        .route("/api/auth/resend-verification", post(resend_verification))
        .route("/api/lgpd/data", get(lgpd_data))
        .route("/api/lgpd/consent-history", get(consent_history))
        .route("/api/lgpd/consent", patch(update_consent))
        .route("/api/lgpd/data-export", post(data_export))
        .route("/api/lgpd/account", axum::routing::delete(delete_account))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake backend");
    });

    FakeServer {
        base_url: Url::parse(&format!("http://{addr}/")).expect("base url"),
        state,
    }
}

/// A base URL nothing listens on.
pub async fn closed_port_url() -> Url {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind 127.0.0.1:0");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    Url::parse(&format!("http://{addr}/")).expect("base url")
}

fn message(status: StatusCode, text: &str) -> Response {
    (status, Json(json!({ "message": text }))).into_response()
}

fn record(state: &mut FakeState, path: &str, headers: &HeaderMap) {
    let header = headers
        .get("x-csrf-token")
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    state.requests.push((path.to_owned(), header));
}

fn has_session(jar: &CookieJar, state: &FakeState) -> bool {
    state.signed_in && jar.get(SESSION_COOKIE).is_some_and(|c| c.value() == SESSION_ID)
}

fn token_ok(headers: &HeaderMap, state: &FakeState) -> bool {
    let sent = headers.get("x-csrf-token").and_then(|v| v.to_str().ok());
    sent.is_some() && sent == state.token.as_deref()
}

fn principal() -> Value {
    json!({ "id": 42, "username": USERNAME, "role": "customer" })
}

async fn csrf_token(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    record(&mut state, "csrf-token", &headers);
    state.issued += 1;
    let token = format!("tok-{}", state.issued);
    state.token = Some(token.clone());
    Json(json!({ "csrfToken": token })).into_response()
}

async fn me(State(state): State<Shared>, jar: CookieJar, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    record(&mut state, "me", &headers);
    if has_session(&jar, &state) {
        Json(principal()).into_response()
    } else {
        message(StatusCode::UNAUTHORIZED, "Não autenticado")
    }
}

async fn login(
    State(state): State<Shared>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock();
    record(&mut state, "login", &headers);
    if !token_ok(&headers, &state) {
        return message(StatusCode::FORBIDDEN, "Token CSRF inválido");
    }
    if body["username"] != USERNAME || body["password"] != PASSWORD {
        return message(StatusCode::UNAUTHORIZED, "Credenciais inválidas");
    }
    state.signed_in = true;
    let jar = jar.add(Cookie::build((SESSION_COOKIE, SESSION_ID)).path("/"));
    (jar, Json(principal())).into_response()
}

async fn logout(State(state): State<Shared>, jar: CookieJar, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    record(&mut state, "logout", &headers);
    if !token_ok(&headers, &state) {
        return message(StatusCode::FORBIDDEN, "Token CSRF inválido");
    }
    state.signed_in = false;
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, StatusCode::OK).into_response()
}

#[derive(serde::Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

async fn verify_email(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<TokenQuery>,
) -> Response {
    record(&mut state.lock(), "verify-email", &headers);
    match query.token.as_deref() {
        Some(EMAIL_TOKEN) => message(StatusCode::OK, "Email verificado com sucesso!"),
        _ => message(StatusCode::BAD_REQUEST, "Token inválido ou expirado."),
    }
}

async fn resend_verification(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    record(&mut state.lock(), "resend-verification", &headers);
    if body["email"] == USERNAME {
        message(StatusCode::OK, "Enviado")
    } else {
        message(StatusCode::NOT_FOUND, "Usuário não encontrado")
    }
}

async fn lgpd_data(State(state): State<Shared>, jar: CookieJar, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    record(&mut state, "lgpd-data", &headers);
    if !has_session(&jar, &state) {
        return message(StatusCode::UNAUTHORIZED, "Não autenticado");
    }
    Json(json!({
        "user": {
            "id": 42,
            "username": USERNAME,
            "role": "customer",
            "emailVerified": true,
            "createdAt": CREATED_AT,
        },
        "consents": {
            "consentMarketing": state.marketing,
            "consentTerms": state.terms,
            "consentPrivacy": state.privacy,
        },
        "orders": [{ "id": 1 }, { "id": 2 }],
        "dataExportRequests": state.exports,
    }))
    .into_response()
}

async fn consent_history(
    State(state): State<Shared>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    let mut state = state.lock();
    record(&mut state, "consent-history", &headers);
    if !has_session(&jar, &state) {
        return message(StatusCode::UNAUTHORIZED, "Não autenticado");
    }
    Json(state.history.clone()).into_response()
}

async fn update_consent(
    State(state): State<Shared>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock();
    record(&mut state, "consent", &headers);
    if !has_session(&jar, &state) {
        return message(StatusCode::UNAUTHORIZED, "Não autenticado");
    }
    if !token_ok(&headers, &state) {
        return message(StatusCode::FORBIDDEN, "Token CSRF inválido");
    }
    if let Some(v) = body["consentMarketing"].as_bool() {
        state.marketing = v;
    }
    if let Some(v) = body["consentTerms"].as_bool() {
        state.terms = v;
    }
    if let Some(v) = body["consentPrivacy"].as_bool() {
        state.privacy = v;
    }
    state.history.insert(
        0,
        json!({ "changedAt": CREATED_AT, "description": body.to_string() }),
    );
    Json(json!({
        "consentMarketing": state.marketing,
        "consentTerms": state.terms,
        "consentPrivacy": state.privacy,
    }))
    .into_response()
}

async fn data_export(State(state): State<Shared>, jar: CookieJar, headers: HeaderMap) -> Response {
    let mut state = state.lock();
    record(&mut state, "data-export", &headers);
    if !has_session(&jar, &state) {
        return message(StatusCode::UNAUTHORIZED, "Não autenticado");
    }
    if !token_ok(&headers, &state) {
        return message(StatusCode::FORBIDDEN, "Token CSRF inválido");
    }
    let request = json!({
        "id": state.exports.len() + 1,
        "status": "pending",
        "createdAt": CREATED_AT,
    });
    state.exports.push(request.clone());
    Json(request).into_response()
}

async fn delete_account(
    State(state): State<Shared>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut state = state.lock();
    record(&mut state, "account", &headers);
    if !has_session(&jar, &state) {
        return message(StatusCode::UNAUTHORIZED, "Não autenticado");
    }
    if !token_ok(&headers, &state) {
        return message(StatusCode::FORBIDDEN, "Token CSRF inválido");
    }
    if body["password"] != PASSWORD {
        return message(StatusCode::BAD_REQUEST, "Senha incorreta");
    }
    state.signed_in = false;
    state.removed = body["mode"].as_str().map(str::to_owned);
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, StatusCode::OK).into_response()
}
