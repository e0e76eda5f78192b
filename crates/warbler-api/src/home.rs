use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use tera::Context;

use warbler_db::queries::PAGE_SIZE;
use warbler_types::models::Message;

use crate::auth::{AppState, db_call};
use crate::error::AppError;
use crate::render::render_page;
use crate::session::{Session, current_user};

/// Marketing page when logged out, timeline of followed users when logged in.
pub async fn homepage(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let Some(user) = current_user(&state, &mut session).await? else {
        let page = render_page(&state, &mut session, None, "home-anon.html", Context::new())?;
        return Ok((session, page).into_response());
    };

    let user_id = user.id;
    let (messages, liked, stats) = db_call(&state, move |db| {
        Ok((
            db.timeline(user_id, PAGE_SIZE)?,
            db.liked_message_ids(user_id)?,
            db.user_stats(user_id)?,
        ))
    })
    .await?;

    let mut ctx = Context::new();
    ctx.insert("messages", &messages.into_iter().map(Message::from).collect::<Vec<_>>());
    ctx.insert("liked", &liked);
    ctx.insert("stats", &stats);

    let page = render_page(&state, &mut session, Some(&user), "home.html", ctx)?;
    Ok((session, page).into_response())
}
