//! Cookie-backed session: the logged-in user id plus pending flash messages.
//!
//! The whole session travels in one HS256-signed token stored in the
//! `warbler_session` cookie. Handlers take a [`Session`] argument, mutate it,
//! and hand it back as part of their response so the cookie is rewritten.

use std::convert::Infallible;

use axum::{
    extract::FromRequestParts,
    http::request::Parts,
    response::{IntoResponse, IntoResponseParts, Response, ResponseParts},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use warbler_db::models::UserRow;
use warbler_types::flash::Flash;

use crate::auth::{AppState, db_call};
use crate::error::AppError;
use crate::render::redirect;

pub const SESSION_COOKIE: &str = "warbler_session";

const SESSION_TTL_DAYS: i64 = 14;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    pub curr_user: Option<i64>,
    #[serde(default)]
    pub flashes: Vec<Flash>,
}

#[derive(Serialize, Deserialize)]
struct SessionClaims {
    #[serde(flatten)]
    data: SessionData,
    exp: usize,
}

/// Signing keys for session tokens, derived from the server secret.
#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    secure: bool,
}

impl SessionKeys {
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            secure: false,
        }
    }

    /// Mark the session cookie `Secure` so browsers only send it over HTTPS.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn encode(&self, data: &SessionData) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = SessionClaims {
            data: data.clone(),
            exp: (chrono::Utc::now() + chrono::Duration::days(SESSION_TTL_DAYS)).timestamp()
                as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Tampered or expired tokens decode to `None`.
    pub fn decode(&self, token: &str) -> Option<SessionData> {
        match decode::<SessionClaims>(token, &self.decoding, &Validation::new(Algorithm::HS256)) {
            Ok(token_data) => Some(token_data.claims.data),
            Err(e) => {
                warn!("Rejected session cookie: {}", e);
                None
            }
        }
    }
}

/// Request-scoped session context.
pub struct Session {
    data: SessionData,
    keys: SessionKeys,
    jar: CookieJar,
}

impl Session {
    pub fn user_id(&self) -> Option<i64> {
        self.data.curr_user
    }

    pub fn login(&mut self, user_id: i64) {
        self.data.curr_user = Some(user_id);
    }

    /// Forget the user. Pending flashes survive so the next page can show them.
    pub fn logout(&mut self) {
        self.data.curr_user = None;
    }

    pub fn flash(&mut self, flash: Flash) {
        self.data.flashes.push(flash);
    }

    /// Hand the pending flashes to a page render; they are shown once.
    pub fn take_flashes(&mut self) -> Vec<Flash> {
        std::mem::take(&mut self.data.flashes)
    }
}

impl FromRequestParts<AppState> for Session {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let data = jar
            .get(SESSION_COOKIE)
            .and_then(|cookie| state.session_keys.decode(cookie.value()))
            .unwrap_or_default();

        Ok(Session {
            data,
            keys: state.session_keys.clone(),
            jar,
        })
    }
}

impl IntoResponseParts for Session {
    type Error = AppError;

    fn into_response_parts(self, res: ResponseParts) -> Result<ResponseParts, Self::Error> {
        let token = self.keys.encode(&self.data)?;
        let cookie = Cookie::build((SESSION_COOKIE, token))
            .path("/")
            .http_only(true)
            .secure(self.keys.secure)
            .same_site(SameSite::Lax);

        match self.jar.add(cookie).into_response_parts(res) {
            Ok(parts) => Ok(parts),
            Err(never) => match never {},
        }
    }
}

/// Load the logged-in user, dropping a session that points at a deleted account.
pub async fn current_user(state: &AppState, session: &mut Session) -> Result<Option<UserRow>, AppError> {
    let Some(user_id) = session.user_id() else {
        return Ok(None);
    };

    let user = db_call(state, move |db| db.get_user(user_id)).await?;
    if user.is_none() {
        warn!("Session refers to missing user #{}", user_id);
        session.logout();
    }
    Ok(user)
}

/// Redirect home with the standard "Access unauthorized." flash.
pub fn unauthorized(mut session: Session) -> Response {
    debug!("Unauthorized request");
    session.flash(Flash::danger("Access unauthorized."));
    (session, redirect("/")).into_response()
}
