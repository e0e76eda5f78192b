use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use tera::Context;
use tracing::{info, warn};

use warbler_db::DbError;
use warbler_db::models::{ProfileUpdate, UserRow};
use warbler_db::queries::PAGE_SIZE;
use warbler_types::flash::Flash;
use warbler_types::forms::{SearchQuery, UserEditForm, non_blank};
use warbler_types::models::{Message, User};

use crate::auth::{AppState, db_call};
use crate::error::AppError;
use crate::render::{redirect, render_page};
use crate::session::{Session, current_user, unauthorized};

/// GET /users — everyone, or the usernames matching `?q=`.
pub async fn list_users(
    State(state): State<AppState>,
    mut session: Session,
    Query(query): Query<SearchQuery>,
) -> Result<Response, AppError> {
    let current = current_user(&state, &mut session).await?;

    let search = non_blank(&query.q).map(str::to_string);
    let viewer = current.as_ref().map(|u| u.id);
    let (users, following_ids) = db_call(&state, move |db| {
        let following_ids = match viewer {
            Some(id) => db.following_ids(id)?,
            None => Vec::new(),
        };
        Ok((db.list_users(search.as_deref())?, following_ids))
    })
    .await?;

    let mut ctx = Context::new();
    ctx.insert("users", &views(&users));
    ctx.insert("following_ids", &following_ids);
    ctx.insert("q", &query.q.unwrap_or_default());

    let page = render_page(&state, &mut session, current.as_ref(), "users/index.html", ctx)?;
    Ok((session, page).into_response())
}

/// GET /users/{user_id} — profile with the user's warbles.
pub async fn show_user(
    State(state): State<AppState>,
    mut session: Session,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    let current = current_user(&state, &mut session).await?;

    let viewer = current.as_ref().map(|u| u.id);
    let profile = db_call(&state, move |db| {
        let Some(user) = db.get_user(user_id)? else {
            return Ok(None);
        };
        let (liked, viewer_follows) = match viewer {
            Some(id) => (db.liked_message_ids(id)?, db.is_following(id, user_id)?),
            None => (Vec::new(), false),
        };
        Ok(Some((
            user,
            db.messages_for_user(user_id, PAGE_SIZE)?,
            db.user_stats(user_id)?,
            liked,
            viewer_follows,
        )))
    })
    .await?;
    let (user, messages, stats, liked, viewer_follows) = profile.ok_or(AppError::NotFound)?;

    let mut ctx = Context::new();
    ctx.insert("user", &User::from(&user));
    ctx.insert("stats", &stats);
    ctx.insert("messages", &messages.into_iter().map(Message::from).collect::<Vec<_>>());
    ctx.insert("liked", &liked);
    ctx.insert("viewer_follows", &viewer_follows);

    let page = render_page(&state, &mut session, current.as_ref(), "users/show.html", ctx)?;
    Ok((session, page).into_response())
}

/// Which relation list a profile sub-page shows.
#[derive(Clone, Copy)]
enum Listing {
    Following,
    Followers,
}

/// GET /users/{user_id}/following
pub async fn show_following(
    State(state): State<AppState>,
    session: Session,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    show_listing(state, session, user_id, Listing::Following).await
}

/// GET /users/{user_id}/followers
pub async fn show_followers(
    State(state): State<AppState>,
    session: Session,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    show_listing(state, session, user_id, Listing::Followers).await
}

async fn show_listing(
    state: AppState,
    mut session: Session,
    user_id: i64,
    listing: Listing,
) -> Result<Response, AppError> {
    let Some(current) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let viewer = current.id;
    let found = db_call(&state, move |db| {
        let Some(user) = db.get_user(user_id)? else {
            return Ok(None);
        };
        let users = match listing {
            Listing::Following => db.following(user_id)?,
            Listing::Followers => db.followers(user_id)?,
        };
        Ok(Some((user, users, db.user_stats(user_id)?, db.following_ids(viewer)?)))
    })
    .await?;
    let (user, users, stats, following_ids) = found.ok_or(AppError::NotFound)?;

    let template = match listing {
        Listing::Following => "users/following.html",
        Listing::Followers => "users/followers.html",
    };

    let mut ctx = Context::new();
    ctx.insert("user", &User::from(&user));
    ctx.insert("stats", &stats);
    ctx.insert("users", &views(&users));
    ctx.insert("following_ids", &following_ids);

    let page = render_page(&state, &mut session, Some(&current), template, ctx)?;
    Ok((session, page).into_response())
}

/// GET /users/{user_id}/likes
pub async fn show_likes(
    State(state): State<AppState>,
    mut session: Session,
    Path(user_id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(current) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let viewer = current.id;
    let found = db_call(&state, move |db| {
        let Some(user) = db.get_user(user_id)? else {
            return Ok(None);
        };
        Ok(Some((
            user,
            db.liked_messages(user_id)?,
            db.user_stats(user_id)?,
            db.liked_message_ids(viewer)?,
        )))
    })
    .await?;
    let (user, messages, stats, liked) = found.ok_or(AppError::NotFound)?;

    let mut ctx = Context::new();
    ctx.insert("user", &User::from(&user));
    ctx.insert("stats", &stats);
    ctx.insert("messages", &messages.into_iter().map(Message::from).collect::<Vec<_>>());
    ctx.insert("liked", &liked);

    let page = render_page(&state, &mut session, Some(&current), "users/likes.html", ctx)?;
    Ok((session, page).into_response())
}

/// GET /users/profile
pub async fn edit_profile_form(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let Some(current) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    edit_page(&state, session, &current)
}

/// POST /users/profile — requires the current password.
pub async fn update_profile(
    State(state): State<AppState>,
    mut session: Session,
    Form(form): Form<UserEditForm>,
) -> Result<Response, AppError> {
    let Some(current) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let username = current.username.clone();
    let password = form.password.clone();
    let verified = db_call(&state, move |db| db.authenticate(&username, &password)).await?;
    if verified.is_none() {
        warn!("Profile update for user #{} with wrong password", current.id);
        session.flash(Flash::danger("Wrong password, please try again."));
        return Ok((session, redirect("/")).into_response());
    }

    if form.username.trim().is_empty() || !form.email.contains('@') {
        session.flash(Flash::danger("Username and a valid email are required."));
        return edit_page(&state, session, &current);
    }

    let update = ProfileUpdate {
        username: form.username.trim().to_string(),
        email: form.email.trim().to_string(),
        image_url: non_blank(&form.image_url).map(str::to_string),
        header_image_url: non_blank(&form.header_image_url).map(str::to_string),
        bio: non_blank(&form.bio).map(str::to_string),
        location: non_blank(&form.location).map(str::to_string),
    };

    let user_id = current.id;
    match db_call(&state, move |db| db.update_user(user_id, &update)).await {
        Ok(Some(_)) => {
            info!("User #{} updated their profile", user_id);
            Ok((session, redirect(format!("/users/{user_id}"))).into_response())
        }
        Ok(None) => Err(AppError::NotFound),
        Err(AppError::Db(DbError::Integrity(detail))) => {
            warn!("Profile update rejected: {}", detail);
            session.flash(Flash::danger("Username or email already taken"));
            edit_page(&state, session, &current)
        }
        Err(e) => Err(e),
    }
}

fn edit_page(state: &AppState, mut session: Session, current: &UserRow) -> Result<Response, AppError> {
    let mut ctx = Context::new();
    ctx.insert("user", &User::from(current));
    let page = render_page(state, &mut session, Some(current), "users/edit.html", ctx)?;
    Ok((session, page).into_response())
}

/// POST /users/delete — remove the account and everything it owns.
pub async fn delete_user(
    State(state): State<AppState>,
    mut session: Session,
) -> Result<Response, AppError> {
    let Some(current) = current_user(&state, &mut session).await? else {
        return Ok(unauthorized(session));
    };

    let user_id = current.id;
    db_call(&state, move |db| db.delete_user(user_id)).await?;
    info!("User #{} deleted their account", user_id);

    session.logout();
    Ok((session, redirect("/signup")).into_response())
}

fn views(users: &[UserRow]) -> Vec<User> {
    users.iter().map(User::from).collect()
}
