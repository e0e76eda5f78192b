#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
    response::Response,
};
use axum_extra::extract::cookie::Cookie;
use http_body_util::BodyExt;
use tower::ServiceExt;

use warbler_api::session::{SESSION_COOKIE, SessionData};
use warbler_api::{AppState, AppStateInner};
use warbler_db::Database;
use warbler_db::models::{NewMessage, NewUser};
use warbler_types::flash::Flash;

pub const TEST_SECRET: &str = "test-secret";

/// A router over a fresh in-memory database.
pub struct TestApp {
    pub state: AppState,
    router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().expect("in-memory database");
        let state = AppStateInner::new(db, TEST_SECRET, false).expect("app state");
        let router = warbler_api::router(state.clone());
        Self { state, router }
    }

    pub fn db(&self) -> &Database {
        &self.state.db
    }

    pub fn signup(&self, username: &str, email: &str, password: &str) -> i64 {
        let user = NewUser::signup(Some(username), Some(email), Some(password), None)
            .expect("valid signup");
        self.db().insert_user(&user).expect("insert user").id
    }

    pub fn message(&self, id: i64, user_id: i64, text: &str) {
        self.db()
            .insert_message(&NewMessage::new(user_id, text).with_id(id))
            .expect("insert message");
    }

    /// `Cookie` header value for a session logged in as `user_id`.
    pub fn session_cookie(&self, user_id: i64) -> String {
        let token = self
            .state
            .session_keys
            .encode(&SessionData {
                curr_user: Some(user_id),
                flashes: vec![],
            })
            .expect("encode session");
        format!("{SESSION_COOKIE}={token}")
    }

    pub async fn get(&self, uri: &str, user: Option<i64>) -> Response {
        let mut req = Request::builder().method("GET").uri(uri);
        if let Some(id) = user {
            req = req.header(header::COOKIE, self.session_cookie(id));
        }
        self.send(req.body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, form: &str, user: Option<i64>) -> Response {
        let mut req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(id) = user {
            req = req.header(header::COOKIE, self.session_cookie(id));
        }
        self.send(req.body(Body::from(form.to_string())).unwrap()).await
    }

    /// Send a hand-built request, for tests that manage cookies themselves.
    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// The session the response wrote back, if any.
    pub fn session(&self, resp: &Response) -> Option<SessionData> {
        resp.headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| Cookie::parse(v.to_string()).ok())
            .find(|c| c.name() == SESSION_COOKIE)
            .and_then(|c| self.state.session_keys.decode(c.value()))
    }

    pub fn flashes(&self, resp: &Response) -> Vec<Flash> {
        self.session(resp).map(|s| s.flashes).unwrap_or_default()
    }

    /// The response is the logged-out redirect home with its danger flash.
    pub fn assert_unauthorized(&self, resp: &Response) {
        assert_eq!(resp.status(), StatusCode::FOUND);
        assert_eq!(location(resp), "/");
        assert!(self.flashes(resp).contains(&Flash::danger("Access unauthorized.")));
    }
}

pub fn location(resp: &Response) -> &str {
    resp.headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

pub async fn body_text(resp: Response) -> String {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}
