use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::auth::{AppState, db_call};
use crate::error::AppError;
use crate::render::redirect;
use crate::session::{Session, current_user, unauthorized};

/// POST /users/add_like/{message_id}
pub async fn add_like(
    State(state): State<AppState>,
    mut session: Session,
    Path(message_id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let user_id = user.id;
    let like = db_call(&state, move |db| {
        if db.get_message(message_id)?.is_none() {
            return Ok(None);
        }
        db.add_like(user_id, message_id).map(Some)
    })
    .await?
    .ok_or(AppError::NotFound)?;

    info!("User #{} liked message #{} (like #{})", user_id, message_id, like.id);
    Ok((session, redirect(format!("/users/{user_id}/likes"))).into_response())
}

/// POST /users/remove_like/{message_id}
pub async fn remove_like(
    State(state): State<AppState>,
    mut session: Session,
    Path(message_id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let user_id = user.id;
    let removed = db_call(&state, move |db| db.remove_like(user_id, message_id)).await?;
    if removed > 0 {
        info!("User #{} unliked message #{}", user_id, message_id);
    }

    Ok((session, redirect(format!("/users/{user_id}/likes"))).into_response())
}
