//! Reaction store: likes on posts and comments.
//!
//! The target is a tagged union, so "both set" and "neither set" are
//! unrepresentable past the boundary. Duplicate likes are caught by the
//! UNIQUE constraint on insert rather than a read-then-write check, which
//! also settles concurrent double-likes.

use rusqlite::{params, Connection};

use crate::db::models::Like;
use crate::error::{AppError, AppResult};

/// The entity a like applies to: exactly one of a post or a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeTarget {
    Post(i64),
    Comment(i64),
}

impl LikeTarget {
    /// Build a target from optional wire fields. Zero or both set is
    /// rejected at this boundary.
    pub fn from_parts(post: Option<i64>, comment: Option<i64>) -> AppResult<LikeTarget> {
        match (post, comment) {
            (Some(id), None) => Ok(LikeTarget::Post(id)),
            (None, Some(id)) => Ok(LikeTarget::Comment(id)),
            (None, None) => Err(AppError::BadRequest(
                "A like must be associated with either a post or a comment.".into(),
            )),
            (Some(_), Some(_)) => Err(AppError::BadRequest(
                "A like cannot be associated with both a post and a comment.".into(),
            )),
        }
    }

    fn noun(&self) -> &'static str {
        match self {
            LikeTarget::Post(_) => "post",
            LikeTarget::Comment(_) => "comment",
        }
    }
}

/// Record a like. Fails with a conflict if the (user, target) pair
/// already exists and with not-found if the target does not.
pub fn like(conn: &Connection, user_id: i64, target: LikeTarget) -> AppResult<Like> {
    ensure_target_exists(conn, target)?;

    let (post_id, comment_id) = target_columns(target);
    let result = conn.execute(
        "INSERT INTO likes (user_id, post_id, comment_id) VALUES (?1, ?2, ?3)",
        params![user_id, post_id, comment_id],
    );
    match result {
        Ok(_) => get_like(conn, conn.last_insert_rowid()),
        Err(rusqlite::Error::SqliteFailure(e, _))
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Err(AppError::Conflict(format!(
                "You have already liked this {}",
                target.noun()
            )))
        }
        Err(e) => Err(e.into()),
    }
}

/// Remove a like. Fails if the user has not liked the target.
pub fn unlike(conn: &Connection, user_id: i64, target: LikeTarget) -> AppResult<()> {
    ensure_target_exists(conn, target)?;

    let deleted = match target {
        LikeTarget::Post(id) => conn.execute(
            "DELETE FROM likes WHERE user_id = ?1 AND post_id = ?2",
            params![user_id, id],
        )?,
        LikeTarget::Comment(id) => conn.execute(
            "DELETE FROM likes WHERE user_id = ?1 AND comment_id = ?2",
            params![user_id, id],
        )?,
    };
    if deleted == 0 {
        return Err(AppError::BadRequest(format!(
            "You have not liked this {}",
            target.noun()
        )));
    }
    Ok(())
}

pub fn count_likes(conn: &Connection, target: LikeTarget) -> AppResult<i64> {
    let count = match target {
        LikeTarget::Post(id) => conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE post_id = ?1",
            params![id],
            |row| row.get(0),
        )?,
        LikeTarget::Comment(id) => conn.query_row(
            "SELECT COUNT(*) FROM likes WHERE comment_id = ?1",
            params![id],
            |row| row.get(0),
        )?,
    };
    Ok(count)
}

fn target_columns(target: LikeTarget) -> (Option<i64>, Option<i64>) {
    match target {
        LikeTarget::Post(id) => (Some(id), None),
        LikeTarget::Comment(id) => (None, Some(id)),
    }
}

fn ensure_target_exists(conn: &Connection, target: LikeTarget) -> AppResult<()> {
    let exists: bool = match target {
        LikeTarget::Post(id) => conn.query_row(
            "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?,
        LikeTarget::Comment(id) => conn.query_row(
            "SELECT COUNT(*) > 0 FROM comments WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )?,
    };
    if !exists {
        let message = match target {
            LikeTarget::Post(_) => "Post not found",
            LikeTarget::Comment(_) => "Comment not found",
        };
        return Err(AppError::NotFound(message.into()));
    }
    Ok(())
}

fn get_like(conn: &Connection, id: i64) -> AppResult<Like> {
    Ok(conn.query_row(
        "SELECT id, user_id, post_id, comment_id, created_at FROM likes WHERE id = ?1",
        params![id],
        |row| {
            Ok(Like {
                id: row.get(0)?,
                user_id: row.get(1)?,
                post_id: row.get(2)?,
                comment_id: row.get(3)?,
                created_at: row.get(4)?,
            })
        },
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blog::store;

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        for (_, sql) in crate::db::MIGRATIONS {
            conn.execute_batch(sql).unwrap();
        }
        conn.execute(
            "INSERT INTO users (student_id, password_hash) VALUES (1001, 'h')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO users (student_id, password_hash) VALUES (1002, 'h')",
            [],
        )
        .unwrap();
        conn
    }

    #[test]
    fn from_parts_requires_exactly_one_target() {
        assert_eq!(
            LikeTarget::from_parts(Some(1), None).unwrap(),
            LikeTarget::Post(1)
        );
        assert_eq!(
            LikeTarget::from_parts(None, Some(2)).unwrap(),
            LikeTarget::Comment(2)
        );
        assert!(LikeTarget::from_parts(None, None).is_err());
        assert!(LikeTarget::from_parts(Some(1), Some(2)).is_err());
    }

    #[test]
    fn like_then_like_again_conflicts() {
        let conn = test_conn();
        let post = store::create_post(&conn, 1, "Welcome", "body").unwrap();
        let target = LikeTarget::Post(post.id);

        let first = like(&conn, 1, target).unwrap();
        assert_eq!(first.post_id, Some(post.id));

        let second = like(&conn, 1, target).unwrap_err();
        assert!(second.to_string().contains("already liked this post"));

        assert_eq!(count_likes(&conn, target).unwrap(), 1);
    }

    #[test]
    fn distinct_users_can_like_same_target() {
        let conn = test_conn();
        let post = store::create_post(&conn, 1, "Welcome", "body").unwrap();
        let target = LikeTarget::Post(post.id);

        like(&conn, 1, target).unwrap();
        like(&conn, 2, target).unwrap();
        assert_eq!(count_likes(&conn, target).unwrap(), 2);
    }

    #[test]
    fn same_user_can_like_post_and_its_comment() {
        let conn = test_conn();
        let post = store::create_post(&conn, 1, "Welcome", "body").unwrap();
        let comment = store::create_comment(&conn, 1, post.id, "Hi", None).unwrap();

        like(&conn, 1, LikeTarget::Post(post.id)).unwrap();
        like(&conn, 1, LikeTarget::Comment(comment.id)).unwrap();

        assert_eq!(count_likes(&conn, LikeTarget::Post(post.id)).unwrap(), 1);
        assert_eq!(
            count_likes(&conn, LikeTarget::Comment(comment.id)).unwrap(),
            1
        );
    }

    #[test]
    fn unlike_decrements_by_one() {
        let conn = test_conn();
        let post = store::create_post(&conn, 1, "Welcome", "body").unwrap();
        let target = LikeTarget::Post(post.id);

        like(&conn, 1, target).unwrap();
        like(&conn, 2, target).unwrap();
        assert_eq!(count_likes(&conn, target).unwrap(), 2);

        unlike(&conn, 1, target).unwrap();
        assert_eq!(count_likes(&conn, target).unwrap(), 1);
    }

    #[test]
    fn unlike_without_like_rejected() {
        let conn = test_conn();
        let post = store::create_post(&conn, 1, "Welcome", "body").unwrap();

        let err = unlike(&conn, 1, LikeTarget::Post(post.id)).unwrap_err();
        assert!(err.to_string().contains("not liked this post"));
    }

    #[test]
    fn like_missing_target_is_not_found() {
        let conn = test_conn();
        assert!(like(&conn, 1, LikeTarget::Post(999)).is_err());
        assert!(like(&conn, 1, LikeTarget::Comment(999)).is_err());
    }

    #[test]
    fn deleting_post_removes_its_likes() {
        let conn = test_conn();
        let post = store::create_post(&conn, 1, "Welcome", "body").unwrap();
        let comment = store::create_comment(&conn, 1, post.id, "Hi", None).unwrap();
        like(&conn, 1, LikeTarget::Post(post.id)).unwrap();
        like(&conn, 2, LikeTarget::Comment(comment.id)).unwrap();

        store::delete_post(&conn, post.id).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM likes", [], |r| r.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }
}
