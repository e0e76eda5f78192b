use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tera::Context;
use tracing::info;

use warbler_db::models::{MAX_MESSAGE_LEN, NewMessage, UserRow};
use warbler_types::flash::Flash;
use warbler_types::forms::MessageForm;
use warbler_types::models::Message;

use crate::auth::{AppState, db_call};
use crate::error::AppError;
use crate::render::{redirect, render_page};
use crate::session::{Session, current_user, unauthorized};

/// GET /messages/new
pub async fn new_message_form(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    message_form_page(&state, session, &user, "")
}

/// POST /messages/new — store a warble for the logged-in user.
pub async fn create_message(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<MessageForm>,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let text = form.text.trim();
    if text.is_empty() {
        session.flash(Flash::danger("Message text is required."));
        return message_form_page(&state, session, &user, &form.text);
    }
    if text.chars().count() > MAX_MESSAGE_LEN {
        session.flash(Flash::danger(format!(
            "Messages are limited to {MAX_MESSAGE_LEN} characters."
        )));
        return message_form_page(&state, session, &user, &form.text);
    }

    let new_message = NewMessage::new(user.id, text);
    let message = db_call(&state, move |db| db.insert_message(&new_message)).await?;
    info!("User #{} posted message #{}", user.id, message.id);

    Ok((session, redirect(format!("/users/{}", user.id))).into_response())
}

fn message_form_page(
    state: &AppState,
    mut session: Session,
    user: &UserRow,
    text: &str,
) -> Result<Response, AppError> {
    let mut ctx = Context::new();
    ctx.insert("text", text);
    ctx.insert("max_len", &MAX_MESSAGE_LEN);
    let page = render_page(state, &mut session, Some(user), "messages/new.html", ctx)?;
    Ok((session, page).into_response())
}

/// GET /messages/{message_id}
pub async fn show_message(
    State(state): State<AppState>,
    mut session: Session,
    Path(message_id): Path<i64>,
) -> Result<Response, AppError> {
    let current = current_user(&state, &mut session).await?;

    let viewer = current.as_ref().map(|u| u.id);
    let (message, liked) = db_call(&state, move |db| {
        let liked = match viewer {
            Some(id) => db.liked_message_ids(id)?,
            None => Vec::new(),
        };
        Ok((db.get_message(message_id)?, liked))
    })
    .await?;
    let message = message.ok_or(AppError::NotFound)?;

    let mut ctx = Context::new();
    ctx.insert("message", &Message::from(message));
    ctx.insert("liked", &liked);

    let page = render_page(&state, &mut session, current.as_ref(), "messages/show.html", ctx)?;
    Ok((session, page).into_response())
}

/// POST /messages/{message_id}/delete — only the author may delete.
pub async fn delete_message(
    State(state): State<AppState>,
    mut session: Session,
    Path(message_id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let message = db_call(&state, move |db| db.get_message(message_id))
        .await?
        .ok_or(AppError::NotFound)?;

    if message.user_id != user.id {
        return Ok(unauthorized(session));
    }

    db_call(&state, move |db| db.delete_message(message_id)).await?;
    info!("User #{} deleted message #{}", user.id, message_id);

    Ok((session, redirect(format!("/users/{}", user.id))).into_response())
}
