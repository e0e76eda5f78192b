use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::info;

use crate::models::{
    DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL, MessageRow, NewMessage, NewUser, ProfileUpdate,
    UserRow,
};
use crate::{Database, Result};

const USER_COLUMNS: &str =
    "u.id, u.email, u.username, u.image_url, u.header_image_url, u.bio, u.location, u.password";

// JOIN users to fetch author fields in a single query (no N+1)
const MESSAGE_SELECT: &str = "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url
     FROM messages m
     JOIN users u ON m.user_id = u.id";

/// Number of warbles shown on the home timeline and on a profile.
pub const PAGE_SIZE: u32 = 100;

impl Database {
    // -- Users --

    /// Persist a user built by `NewUser::signup`.
    pub fn insert_user(&self, user: &NewUser) -> Result<UserRow> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (email, username, password, image_url) VALUES (?1, ?2, ?3, ?4)",
                params![user.email, user.username, user.password, user.image_url],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        info!("Created user #{}", id);
        self.get_user(id)?
            .ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
    }

    pub fn get_user(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.id = ?1", id))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "u.username = ?1", username))
    }

    /// All users, optionally filtered by a username substring.
    ///
    /// The match is literal and case-sensitive: `%` and `_` are ordinary characters.
    pub fn list_users(&self, search: Option<&str>) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLUMNS} FROM users u
                 WHERE ?1 IS NULL OR instr(u.username, ?1) > 0
                 ORDER BY u.id"
            ))?;
            let rows = stmt
                .query_map([search], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Overwrite the editable profile fields. Blank images fall back to the defaults.
    pub fn update_user(&self, id: i64, update: &ProfileUpdate) -> Result<Option<UserRow>> {
        let changed = self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET
                    username = ?2,
                    email = ?3,
                    image_url = ?4,
                    header_image_url = ?5,
                    bio = ?6,
                    location = ?7
                 WHERE id = ?1",
                params![
                    id,
                    update.username,
                    update.email,
                    update.image_url.as_deref().unwrap_or(DEFAULT_IMAGE_URL),
                    update
                        .header_image_url
                        .as_deref()
                        .unwrap_or(DEFAULT_HEADER_IMAGE_URL),
                    update.bio,
                    update.location,
                ],
            )?;
            Ok(changed)
        })?;

        if changed == 0 {
            return Ok(None);
        }
        info!("Updated profile of user #{}", id);
        self.get_user(id)
    }

    /// Delete a user and everything hanging off it, in one transaction.
    ///
    /// Order: the user's likes, likes on the user's messages, follow edges in
    /// both directions, the user's messages, then the user.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        let deleted = self.with_tx(|tx| {
            tx.execute("DELETE FROM likes WHERE user_id = ?1", [id])?;
            tx.execute(
                "DELETE FROM likes WHERE message_id IN (SELECT id FROM messages WHERE user_id = ?1)",
                [id],
            )?;
            tx.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 OR user_following_id = ?1",
                [id],
            )?;
            tx.execute("DELETE FROM messages WHERE user_id = ?1", [id])?;
            Ok(tx.execute("DELETE FROM users WHERE id = ?1", [id])? > 0)
        })?;

        if deleted {
            info!("Deleted user #{}", id);
        }
        Ok(deleted)
    }

    // -- Messages --

    pub fn insert_message(&self, message: &NewMessage) -> Result<MessageRow> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, text, user_id) VALUES (?1, ?2, ?3)",
                params![message.id, message.text, message.user_id],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        self.get_message(id)?
            .ok_or_else(|| rusqlite::Error::QueryReturnedNoRows.into())
    }

    pub fn get_message(&self, id: i64) -> Result<Option<MessageRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{MESSAGE_SELECT} WHERE m.id = ?1"), [id], message_from_row)
                .optional()?;
            Ok(row)
        })
    }

    /// Delete a message and its likes. Returns `false` if it was already gone.
    pub fn delete_message(&self, id: i64) -> Result<bool> {
        self.with_tx(|tx| {
            tx.execute("DELETE FROM likes WHERE message_id = ?1", [id])?;
            Ok(tx.execute("DELETE FROM messages WHERE id = ?1", [id])? > 0)
        })
    }

    /// A user's own warbles, newest first.
    pub fn messages_for_user(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                &format!(
                    "{MESSAGE_SELECT} WHERE m.user_id = ?1
                     ORDER BY m.timestamp DESC, m.id DESC LIMIT ?2"
                ),
                user_id,
                limit,
            )
        })
    }

    /// Home timeline: the user's warbles plus those of everyone they follow.
    pub fn timeline(&self, user_id: i64, limit: u32) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                &format!(
                    "{MESSAGE_SELECT}
                     WHERE m.user_id = ?1
                        OR m.user_id IN (
                            SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1
                        )
                     ORDER BY m.timestamp DESC, m.id DESC LIMIT ?2"
                ),
                user_id,
                limit,
            )
        })
    }
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        image_url: row.get(3)?,
        header_image_url: row.get(4)?,
        bio: row.get(5)?,
        location: row.get(6)?,
        password: row.get(7)?,
    })
}

pub(crate) fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        text: row.get(1)?,
        timestamp: row.get(2)?,
        user_id: row.get(3)?,
        author_username: row.get(4)?,
        author_image_url: row.get(5)?,
    })
}

pub(crate) fn query_users(conn: &Connection, sql: &str, id: i64) -> Result<Vec<UserRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map([id], user_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub(crate) fn query_messages(
    conn: &Connection,
    sql: &str,
    user_id: i64,
    limit: u32,
) -> Result<Vec<MessageRow>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params![user_id, limit], message_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn query_user<P: rusqlite::ToSql>(
    conn: &Connection,
    condition: &str,
    value: P,
) -> Result<Option<UserRow>> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE {condition}"),
            [value],
            user_from_row,
        )
        .optional()?;
    Ok(row)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Inserts a user with a placeholder hash; these tests never log in.
    pub(crate) fn user(db: &Database, username: &str, email: &str) -> UserRow {
        db.insert_user(&NewUser {
            email: Some(email.to_string()),
            username: Some(username.to_string()),
            password: "HASHED_PASSWORD".to_string(),
            image_url: DEFAULT_IMAGE_URL.to_string(),
        })
        .unwrap()
    }

    #[test]
    fn new_user_has_no_messages_or_followers() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "testuser", "test@test.com");

        assert!(db.messages_for_user(u.id, PAGE_SIZE).unwrap().is_empty());
        assert!(db.followers(u.id).unwrap().is_empty());
        assert_eq!(u.header_image_url, DEFAULT_HEADER_IMAGE_URL);
        assert_eq!(u.bio, None);
    }

    #[test]
    fn user_display() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "testuser", "test@test.com");

        assert_eq!(u.to_string(), format!("<User #{}: testuser, test@test.com>", u.id));
        assert_eq!(format!("{u:?}"), u.to_string());
    }

    #[test]
    fn message_belongs_to_user() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "testuser", "test@test.com");

        let m = db.insert_message(&NewMessage::new(u.id, "tester warble")).unwrap();

        let messages = db.messages_for_user(u.id, PAGE_SIZE).unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, m.id);
        assert_eq!(messages[0].text, "tester warble");
        assert_eq!(messages[0].author_username, "testuser");
    }

    #[test]
    fn message_keeps_explicit_id() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "testuser", "test@test.com");

        let m = db
            .insert_message(&NewMessage::new(u.id, "This is a warble").with_id(1000))
            .unwrap();
        assert_eq!(m.id, 1000);
        assert!(db.get_message(1000).unwrap().is_some());
    }

    #[test]
    fn message_requires_existing_owner() {
        let db = Database::open_in_memory().unwrap();
        let err = db.insert_message(&NewMessage::new(42, "orphan")).unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn message_longer_than_limit_is_rejected() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "testuser", "test@test.com");

        let text = "x".repeat(crate::models::MAX_MESSAGE_LEN + 1);
        assert!(db.insert_message(&NewMessage::new(u.id, text)).unwrap_err().is_integrity());
    }

    #[test]
    fn deleting_missing_message_reports_absence() {
        let db = Database::open_in_memory().unwrap();
        assert!(!db.delete_message(1000).unwrap());
        assert!(db.get_message(1000).unwrap().is_none());
    }

    #[test]
    fn timeline_includes_followed_users_only() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "a", "a@test.com");
        let b = user(&db, "b", "b@test.com");
        let c = user(&db, "c", "c@test.com");
        db.follow(a.id, b.id).unwrap();

        db.insert_message(&NewMessage::new(a.id, "mine")).unwrap();
        db.insert_message(&NewMessage::new(b.id, "followed")).unwrap();
        db.insert_message(&NewMessage::new(c.id, "stranger")).unwrap();

        let texts: Vec<_> = db
            .timeline(a.id, PAGE_SIZE)
            .unwrap()
            .into_iter()
            .map(|m| m.text)
            .collect();
        assert_eq!(texts, vec!["followed", "mine"]);
    }

    #[test]
    fn list_users_filters_by_substring() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "alice", "alice@test.com");
        user(&db, "bob", "bob@test.com");

        assert_eq!(db.list_users(None).unwrap().len(), 2);
        let found = db.list_users(Some("lic")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].username, "alice");
    }

    #[test]
    fn list_users_matches_wildcard_characters_literally() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "alice", "alice@test.com");
        user(&db, "bob", "bob@test.com");
        user(&db, "a_b", "ab@test.com");
        user(&db, "100%", "pct@test.com");

        let names = |q: &str| -> Vec<String> {
            db.list_users(Some(q))
                .unwrap()
                .into_iter()
                .map(|u| u.username)
                .collect()
        };
        assert_eq!(names("_"), vec!["a_b"]);
        assert_eq!(names("%"), vec!["100%"]);
        assert_eq!(names("a%b"), Vec::<String>::new());
    }

    #[test]
    fn list_users_is_case_sensitive() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "alice", "alice@test.com");

        assert!(db.list_users(Some("ALI")).unwrap().is_empty());
        assert_eq!(db.list_users(Some("ali")).unwrap().len(), 1);
    }

    #[test]
    fn update_user_sets_profile_fields() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "alice", "alice@test.com");

        let updated = db
            .update_user(
                u.id,
                &ProfileUpdate {
                    username: "alice2".into(),
                    email: "alice@test.com".into(),
                    bio: Some("hello".into()),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.username, "alice2");
        assert_eq!(updated.bio.as_deref(), Some("hello"));
        assert_eq!(updated.image_url, u.image_url);
    }

    #[test]
    fn update_user_clears_blank_fields() {
        let db = Database::open_in_memory().unwrap();
        let u = user(&db, "alice", "alice@test.com");
        let filled = ProfileUpdate {
            username: "alice".into(),
            email: "alice@test.com".into(),
            image_url: Some("/pic.png".into()),
            header_image_url: Some("/header.png".into()),
            bio: Some("old bio".into()),
            location: Some("Lisbon".into()),
        };
        db.update_user(u.id, &filled).unwrap();

        let cleared = db
            .update_user(
                u.id,
                &ProfileUpdate {
                    username: "alice".into(),
                    email: "alice@test.com".into(),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(cleared.bio, None);
        assert_eq!(cleared.location, None);
        assert_eq!(cleared.image_url, DEFAULT_IMAGE_URL);
        assert_eq!(cleared.header_image_url, DEFAULT_HEADER_IMAGE_URL);
    }

    #[test]
    fn update_user_to_taken_username_is_integrity_error() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "alice", "alice@test.com");
        user(&db, "bob", "bob@test.com");

        let err = db
            .update_user(
                a.id,
                &ProfileUpdate {
                    username: "bob".into(),
                    email: "alice@test.com".into(),
                    ..Default::default()
                },
            )
            .unwrap_err();
        assert!(err.is_integrity());
    }

    #[test]
    fn delete_user_removes_owned_rows() {
        let db = Database::open_in_memory().unwrap();
        let a = user(&db, "a", "a@test.com");
        let b = user(&db, "b", "b@test.com");
        let mine = db.insert_message(&NewMessage::new(a.id, "mine")).unwrap();
        let theirs = db.insert_message(&NewMessage::new(b.id, "theirs")).unwrap();
        db.follow(a.id, b.id).unwrap();
        db.follow(b.id, a.id).unwrap();
        db.add_like(a.id, theirs.id).unwrap();
        db.add_like(b.id, mine.id).unwrap();

        assert!(db.delete_user(a.id).unwrap());

        assert!(db.get_user(a.id).unwrap().is_none());
        assert!(db.get_message(mine.id).unwrap().is_none());
        assert!(db.get_message(theirs.id).unwrap().is_some());
        assert!(db.followers(b.id).unwrap().is_empty());
        assert!(db.liked_messages(b.id).unwrap().is_empty());
        assert!(!db.delete_user(a.id).unwrap());
    }

    #[test]
    fn reset_recreates_empty_schema() {
        let db = Database::open_in_memory().unwrap();
        user(&db, "a", "a@test.com");

        db.reset().unwrap();
        assert!(db.list_users(None).unwrap().is_empty());
    }
}
