use rusqlite::params;
use tracing::debug;
use warbler_types::models::UserStats;

use crate::models::{FollowRow, LikeRow, MessageRow, UserRow};
use crate::queries::{query_messages, query_users};
use crate::{Database, Result};

impl Database {
    // -- Follows --

    /// Add the edge `follower -> followed`. Following twice is a no-op.
    pub fn follow(&self, follower_id: i64, followed_id: i64) -> Result<FollowRow> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR IGNORE INTO follows (user_being_followed_id, user_following_id)
                 VALUES (?1, ?2)",
                [followed_id, follower_id],
            )?;
            Ok(())
        })?;

        debug!("User #{} follows #{}", follower_id, followed_id);
        Ok(FollowRow {
            user_being_followed_id: followed_id,
            user_following_id: follower_id,
        })
    }

    /// Remove the edge `follower -> followed`. Returns whether it existed.
    pub fn unfollow(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        let removed = self.with_conn(|conn| {
            Ok(conn.execute(
                "DELETE FROM follows WHERE user_being_followed_id = ?1 AND user_following_id = ?2",
                [followed_id, follower_id],
            )? > 0)
        })?;

        debug!("User #{} unfollows #{} (existed: {})", follower_id, followed_id, removed);
        Ok(removed)
    }

    /// Does `user_id` follow `other_id`?
    pub fn is_following(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.edge_exists(user_id, other_id)
    }

    /// Is `user_id` followed by `other_id`?
    pub fn is_followed_by(&self, user_id: i64, other_id: i64) -> Result<bool> {
        self.edge_exists(other_id, user_id)
    }

    /// Users that `user_id` follows.
    pub fn following(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "SELECT u.id, u.email, u.username, u.image_url, u.header_image_url, u.bio, u.location, u.password
                 FROM follows f
                 JOIN users u ON u.id = f.user_being_followed_id
                 WHERE f.user_following_id = ?1
                 ORDER BY u.id",
                user_id,
            )
        })
    }

    /// Users that follow `user_id`.
    pub fn followers(&self, user_id: i64) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            query_users(
                conn,
                "SELECT u.id, u.email, u.username, u.image_url, u.header_image_url, u.bio, u.location, u.password
                 FROM follows f
                 JOIN users u ON u.id = f.user_following_id
                 WHERE f.user_being_followed_id = ?1
                 ORDER BY u.id",
                user_id,
            )
        })
    }

    /// Ids of the users `user_id` follows, for rendering follow buttons.
    pub fn following_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_being_followed_id FROM follows WHERE user_following_id = ?1",
            )?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    fn edge_exists(&self, follower_id: i64, followed_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM follows
                 WHERE user_following_id = ?1 AND user_being_followed_id = ?2",
                [follower_id, followed_id],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
    }

    // -- Likes --

    /// Record a like. Repeated likes of the same message add more rows.
    pub fn add_like(&self, user_id: i64, message_id: i64) -> Result<LikeRow> {
        let id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO likes (user_id, message_id) VALUES (?1, ?2)",
                [user_id, message_id],
            )?;
            Ok(conn.last_insert_rowid())
        })?;

        debug!("User #{} likes message #{}", user_id, message_id);
        Ok(LikeRow {
            id,
            user_id,
            message_id,
        })
    }

    /// Drop every like `user_id` placed on `message_id`. Returns the row count.
    pub fn remove_like(&self, user_id: i64, message_id: i64) -> Result<usize> {
        self.with_conn(|conn| {
            let removed = conn.execute(
                "DELETE FROM likes WHERE user_id = ?1 AND message_id = ?2",
                [user_id, message_id],
            )?;
            Ok(removed)
        })
    }

    /// Messages `user_id` has liked, most recently liked first, one entry per message.
    pub fn liked_messages(&self, user_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            query_messages(
                conn,
                "SELECT m.id, m.text, m.timestamp, m.user_id, u.username, u.image_url
                 FROM messages m
                 JOIN users u ON m.user_id = u.id
                 JOIN (
                     SELECT message_id, MAX(id) AS last_like
                     FROM likes WHERE user_id = ?1 GROUP BY message_id
                 ) l ON l.message_id = m.id
                 ORDER BY l.last_like DESC
                 LIMIT ?2",
                user_id,
                u32::MAX,
            )
        })
    }

    /// Ids of the messages `user_id` has liked, for rendering like buttons.
    pub fn liked_message_ids(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT message_id FROM likes WHERE user_id = ?1")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }

    pub fn user_stats(&self, user_id: i64) -> Result<UserStats> {
        self.with_conn(|conn| {
            let stats = conn.query_row(
                "SELECT
                    (SELECT COUNT(*) FROM messages WHERE user_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_following_id = ?1),
                    (SELECT COUNT(*) FROM follows WHERE user_being_followed_id = ?1),
                    (SELECT COUNT(DISTINCT message_id) FROM likes WHERE user_id = ?1)",
                params![user_id],
                |row| {
                    Ok(UserStats {
                        messages: row.get(0)?,
                        following: row.get(1)?,
                        followers: row.get(2)?,
                        likes: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
    }
}
