use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn create_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id                  INTEGER PRIMARY KEY AUTOINCREMENT,
            email               TEXT NOT NULL UNIQUE,
            username            TEXT NOT NULL UNIQUE,
            image_url           TEXT NOT NULL DEFAULT '/static/images/default-pic.png',
            header_image_url    TEXT NOT NULL DEFAULT '/static/images/warbler-hero.jpg',
            bio                 TEXT,
            location            TEXT,
            password            TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS messages (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            text        TEXT NOT NULL CHECK (length(text) <= 140),
            timestamp   TEXT NOT NULL DEFAULT (datetime('now')),
            user_id     INTEGER NOT NULL REFERENCES users(id)
        );

        CREATE INDEX IF NOT EXISTS idx_messages_user
            ON messages(user_id, timestamp);

        CREATE TABLE IF NOT EXISTS follows (
            user_being_followed_id  INTEGER NOT NULL REFERENCES users(id),
            user_following_id       INTEGER NOT NULL REFERENCES users(id),
            PRIMARY KEY (user_being_followed_id, user_following_id)
        );

        CREATE INDEX IF NOT EXISTS idx_follows_following
            ON follows(user_following_id);

        -- no UNIQUE(user_id, message_id): repeated likes are kept
        CREATE TABLE IF NOT EXISTS likes (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id     INTEGER NOT NULL REFERENCES users(id),
            message_id  INTEGER NOT NULL REFERENCES messages(id)
        );

        CREATE INDEX IF NOT EXISTS idx_likes_user
            ON likes(user_id);
        ",
    )?;

    info!("Database schema ready");
    Ok(())
}

pub fn drop_all(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS likes;
        DROP TABLE IF EXISTS follows;
        DROP TABLE IF EXISTS messages;
        DROP TABLE IF EXISTS users;
        ",
    )?;

    info!("Database schema dropped");
    Ok(())
}
