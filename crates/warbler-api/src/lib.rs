pub mod auth;
pub mod error;
pub mod follows;
pub mod home;
pub mod likes;
pub mod messages;
pub mod render;
pub mod session;
pub mod users;

use axum::{
    Router,
    routing::{get, post},
};

pub use auth::{AppState, AppStateInner};

/// Every Warbler page and form endpoint, bound to `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::homepage))
        .route("/signup", get(auth::signup_form).post(auth::signup))
        .route("/login", get(auth::login_form).post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/users", get(users::list_users))
        .route("/users/profile", get(users::edit_profile_form).post(users::update_profile))
        .route("/users/delete", post(users::delete_user))
        .route("/users/{user_id}", get(users::show_user))
        .route("/users/{user_id}/following", get(users::show_following))
        .route("/users/{user_id}/followers", get(users::show_followers))
        .route("/users/{user_id}/likes", get(users::show_likes))
        .route("/users/follow/{follow_id}", post(follows::add_follow))
        .route("/users/stop-following/{follow_id}", post(follows::stop_following))
        .route("/users/add_like/{message_id}", post(likes::add_like))
        .route("/users/remove_like/{message_id}", post(likes::remove_like))
        .route("/messages/new", get(messages::new_message_form).post(messages::create_message))
        .route("/messages/{message_id}", get(messages::show_message))
        .route("/messages/{message_id}/delete", post(messages::delete_message))
        .with_state(state)
}
