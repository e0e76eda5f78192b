use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use tracing::info;

use crate::auth::{AppState, db_call};
use crate::error::AppError;
use crate::render::redirect;
use crate::session::{Session, current_user, unauthorized};

/// POST /users/follow/{follow_id}
pub async fn add_follow(
    State(state): State<AppState>,
    mut session: Session,
    Path(follow_id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let user_id = user.id;
    let followed = db_call(&state, move |db| {
        if db.get_user(follow_id)?.is_none() {
            return Ok(false);
        }
        db.follow(user_id, follow_id)?;
        Ok(true)
    })
    .await?;

    if !followed {
        return Err(AppError::NotFound);
    }

    info!("User #{} now follows #{}", user_id, follow_id);
    Ok((session, redirect(format!("/users/{user_id}/following"))).into_response())
}

/// POST /users/stop-following/{follow_id}
pub async fn stop_following(
    State(state): State<AppState>,
    mut session: Session,
    Path(follow_id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let user_id = user.id;
    if db_call(&state, move |db| db.unfollow(user_id, follow_id)).await? {
        info!("User #{} stopped following #{}", user_id, follow_id);
    }

    Ok((session, redirect(format!("/users/{user_id}/following"))).into_response())
}
