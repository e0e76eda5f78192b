use axum::{
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use tera::{Context, Tera};

use warbler_db::models::UserRow;
use warbler_types::models::User;

use crate::auth::AppState;
use crate::error::AppError;
use crate::session::Session;

/// HTML templates compiled into the binary. Names ending in `.html` are autoescaped.
pub struct Templates {
    tera: Tera,
}

impl Templates {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("base.html", include_str!("../templates/base.html")),
            ("macros.html", include_str!("../templates/macros.html")),
            ("home.html", include_str!("../templates/home.html")),
            ("home-anon.html", include_str!("../templates/home-anon.html")),
            ("users/signup.html", include_str!("../templates/users/signup.html")),
            ("users/login.html", include_str!("../templates/users/login.html")),
            ("users/index.html", include_str!("../templates/users/index.html")),
            ("users/show.html", include_str!("../templates/users/show.html")),
            ("users/following.html", include_str!("../templates/users/following.html")),
            ("users/followers.html", include_str!("../templates/users/followers.html")),
            ("users/likes.html", include_str!("../templates/users/likes.html")),
            ("users/edit.html", include_str!("../templates/users/edit.html")),
            ("messages/new.html", include_str!("../templates/messages/new.html")),
            ("messages/show.html", include_str!("../templates/messages/show.html")),
        ])?;
        Ok(Self { tera })
    }

    pub fn render(&self, name: &str, ctx: &Context) -> Result<String, tera::Error> {
        self.tera.render(name, ctx)
    }
}

/// Render a full page. Consumes the session's pending flashes.
pub fn render_page(
    state: &AppState,
    session: &mut Session,
    current: Option<&UserRow>,
    template: &str,
    mut ctx: Context,
) -> Result<Html<String>, AppError> {
    ctx.insert("flashes", &session.take_flashes());
    ctx.insert("current_user", &current.map(User::from));
    ctx.insert("current_user_id", &current.map(|u| u.id));

    Ok(Html(state.templates.render(template, &ctx)?))
}

/// `302 Found` to `location`.
pub fn redirect(location: impl Into<String>) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.into())]).into_response()
}
