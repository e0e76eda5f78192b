//! Database row types. These map directly to SQLite rows and stay distinct
//! from the warbler-types view models so the DB layer owns its own shapes.

use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use tracing::warn;
use warbler_types::models::{Message, User};

pub const DEFAULT_IMAGE_URL: &str = "/static/images/default-pic.png";
pub const DEFAULT_HEADER_IMAGE_URL: &str = "/static/images/warbler-hero.jpg";

/// Longest warble the schema accepts, in characters.
pub const MAX_MESSAGE_LEN: usize = 140;

#[derive(Clone, PartialEq, Eq)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub image_url: String,
    pub header_image_url: String,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub password: String,
}

impl fmt::Display for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User #{}: {}, {}>", self.id, self.username, self.email)
    }
}

// Keeps the password hash out of logs.
impl fmt::Debug for UserRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// A user built by `NewUser::signup` that has not been inserted yet.
///
/// `email` and `username` stay optional here: their absence is only
/// reported when the row is written and the NOT NULL constraint fires.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password: String,
    pub image_url: String,
}

/// Editable profile fields. `None` clears `bio` and `location` and resets
/// the images to their defaults.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub image_url: Option<String>,
    pub header_image_url: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRow {
    pub id: i64,
    pub text: String,
    pub timestamp: String,
    pub user_id: i64,
    pub author_username: String,
    pub author_image_url: String,
}

#[derive(Debug, Clone)]
pub struct NewMessage {
    /// Explicit primary key; `None` lets SQLite assign one.
    pub id: Option<i64>,
    pub text: String,
    pub user_id: i64,
}

impl NewMessage {
    pub fn new(user_id: i64, text: impl Into<String>) -> Self {
        Self {
            id: None,
            text: text.into(),
            user_id,
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FollowRow {
    pub user_being_followed_id: i64,
    pub user_following_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeRow {
    pub id: i64,
    pub user_id: i64,
    pub message_id: i64,
}

impl From<&UserRow> for User {
    fn from(row: &UserRow) -> Self {
        User {
            id: row.id,
            username: row.username.clone(),
            email: row.email.clone(),
            image_url: row.image_url.clone(),
            header_image_url: row.header_image_url.clone(),
            bio: row.bio.clone(),
            location: row.location.clone(),
        }
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        let timestamp = parse_timestamp(&row.timestamp).unwrap_or_else(|| {
            warn!("Corrupt timestamp '{}' on message {}", row.timestamp, row.id);
            DateTime::default()
        });

        Message {
            id: row.id,
            text: row.text,
            timestamp,
            user_id: row.user_id,
            author_username: row.author_username,
            author_image_url: row.author_image_url,
        }
    }
}

/// SQLite's `datetime('now')` has no timezone; the value is UTC.
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    raw.parse::<DateTime<Utc>>()
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|ndt| ndt.and_utc())
        })
}
