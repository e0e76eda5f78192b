use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use tera::Context;
use tracing::{error, info, warn};

use warbler_db::models::NewUser;
use warbler_db::{Database, DbError};
use warbler_types::flash::Flash;
use warbler_types::forms::{LoginForm, SignupForm, non_blank};

use crate::error::AppError;
use crate::render::{Templates, redirect, render_page};
use crate::session::{Session, SessionKeys, current_user};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub session_keys: SessionKeys,
    pub templates: Templates,
}

impl AppStateInner {
    pub fn new(db: Database, secret_key: &str, secure_cookies: bool) -> Result<AppState, AppError> {
        Ok(Arc::new(Self {
            db,
            session_keys: SessionKeys::new(secret_key.as_bytes()).secure(secure_cookies),
            templates: Templates::new()?,
        }))
    }
}

/// Run blocking DB work off the async runtime.
pub async fn db_call<F, T>(state: &AppState, f: F) -> Result<T, AppError>
where
    F: FnOnce(&Database) -> warbler_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .inspect_err(|e| error!("spawn_blocking join error: {}", e))?;
    Ok(result?)
}

pub async fn signup_form(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let current = current_user(&state, &mut session).await?;
    let page = render_page(&state, &mut session, current.as_ref(), "users/signup.html", Context::new())?;
    Ok((session, page).into_response())
}

/// Create the account and log it in. A taken username or email re-renders the form.
pub async fn signup(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    if let Some(problem) = signup_problem(&form) {
        session.flash(Flash::danger(problem));
        return signup_retry(&state, session, &form);
    }

    let username = form.username.trim().to_string();
    let email = form.email.trim().to_string();
    let password = form.password.clone();
    let image_url = non_blank(&form.image_url).map(str::to_string);

    let created = db_call(&state, move |db| {
        let user = NewUser::signup(
            Some(username.as_str()),
            Some(email.as_str()),
            Some(password.as_str()),
            image_url.as_deref(),
        )?;
        db.insert_user(&user)
    })
    .await;

    match created {
        Ok(user) => {
            info!("New signup: {}", user);
            session.login(user.id);
            Ok((session, redirect("/")).into_response())
        }
        Err(AppError::Db(DbError::Integrity(detail))) => {
            warn!("Signup rejected: {}", detail);
            session.flash(Flash::danger("Username already taken"));
            signup_retry(&state, session, &form)
        }
        Err(AppError::Db(DbError::Validation(e))) => {
            session.flash(Flash::danger(e.to_string()));
            signup_retry(&state, session, &form)
        }
        Err(e) => Err(e),
    }
}

fn signup_problem(form: &SignupForm) -> Option<&'static str> {
    if form.username.trim().is_empty() {
        Some("Username is required.")
    } else if !form.email.contains('@') {
        Some("Please enter a valid email address.")
    } else if form.password.len() < 6 {
        Some("Password must be at least 6 characters.")
    } else {
        None
    }
}

fn signup_retry(state: &AppState, mut session: Session, form: &SignupForm) -> Result<Response, AppError> {
    let mut ctx = Context::new();
    ctx.insert("username", &form.username);
    ctx.insert("email", &form.email);
    let page = render_page(state, &mut session, None, "users/signup.html", ctx)?;
    Ok((session, page).into_response())
}

pub async fn login_form(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let current = current_user(&state, &mut session).await?;
    let page = render_page(&state, &mut session, current.as_ref(), "users/login.html", Context::new())?;
    Ok((session, page).into_response())
}

pub async fn login(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let username = form.username.clone();
    let password = form.password;
    let user = db_call(&state, move |db| db.authenticate(&username, &password)).await?;

    match user {
        Some(user) => {
            info!("User #{} logged in", user.id);
            session.login(user.id);
            session.flash(Flash::success(format!("Hello, {}!", user.username)));
            Ok((session, redirect("/")).into_response())
        }
        None => {
            warn!("Failed login for {}", form.username);
            session.flash(Flash::danger("Invalid credentials."));
            let mut ctx = Context::new();
            ctx.insert("username", &form.username);
            let page = render_page(&state, &mut session, None, "users/login.html", ctx)?;
            Ok((session, page).into_response())
        }
    }
}

pub async fn logout(mut session: Session) -> Response {
    if let Some(user_id) = session.user_id() {
        info!("User #{} logged out", user_id);
    }
    session.logout();
    session.flash(Flash::message("You have successfully logged out"));
    (session, redirect("/login")).into_response()
}
