//! Content store: posts and comments over SQLite.
//!
//! Cascades (post -> comments -> replies, and likes on any of them) are
//! declared in the schema; callers never clean up dependents by hand.

use rusqlite::{params, Connection};

use crate::db::models::{Comment, Post};
use crate::error::{AppError, AppResult};

pub fn create_post(
    conn: &Connection,
    author_id: i64,
    title: &str,
    content: &str,
) -> AppResult<Post> {
    conn.execute(
        "INSERT INTO posts (author_id, title, content) VALUES (?1, ?2, ?3)",
        params![author_id, title, content],
    )?;
    get_post(conn, conn.last_insert_rowid())
}

pub fn get_post(conn: &Connection, id: i64) -> AppResult<Post> {
    let result = conn.query_row(
        "SELECT id, author_id, title, content, created_at FROM posts WHERE id = ?1",
        params![id],
        post_from_row,
    );
    match result {
        Ok(post) => Ok(post),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(AppError::NotFound("Post not found".into()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Full update, PUT semantics: both fields replaced.
pub fn update_post(conn: &Connection, id: i64, title: &str, content: &str) -> AppResult<Post> {
    let changed = conn.execute(
        "UPDATE posts SET title = ?1, content = ?2 WHERE id = ?3",
        params![title, content, id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound("Post not found".into()));
    }
    get_post(conn, id)
}

pub fn delete_post(conn: &Connection, id: i64) -> AppResult<()> {
    let deleted = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(AppError::NotFound("Post not found".into()));
    }
    Ok(())
}

/// Create a comment on a post, optionally as a reply to `parent_id`.
///
/// A parent must exist and belong to the same post; replies crossing post
/// boundaries are rejected before insert.
pub fn create_comment(
    conn: &Connection,
    author_id: i64,
    post_id: i64,
    content: &str,
    parent_id: Option<i64>,
) -> AppResult<Comment> {
    // Verify the post exists
    get_post(conn, post_id)?;

    if let Some(parent_id) = parent_id {
        let parent = get_comment(conn, parent_id)?;
        if parent.post_id != post_id {
            return Err(AppError::BadRequest(
                "Parent comment does not belong to this post".into(),
            ));
        }
    }

    conn.execute(
        "INSERT INTO comments (post_id, author_id, content, parent_id) VALUES (?1, ?2, ?3, ?4)",
        params![post_id, author_id, content, parent_id],
    )?;
    get_comment(conn, conn.last_insert_rowid())
}

pub fn get_comment(conn: &Connection, id: i64) -> AppResult<Comment> {
    let result = conn.query_row(
        "SELECT id, post_id, author_id, content, parent_id, created_at
         FROM comments WHERE id = ?1",
        params![id],
        comment_from_row,
    );
    match result {
        Ok(comment) => Ok(comment),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(AppError::NotFound("Comment not found".into()))
        }
        Err(e) => Err(e.into()),
    }
}

pub fn update_comment(conn: &Connection, id: i64, content: &str) -> AppResult<Comment> {
    let changed = conn.execute(
        "UPDATE comments SET content = ?1 WHERE id = ?2",
        params![content, id],
    )?;
    if changed == 0 {
        return Err(AppError::NotFound("Comment not found".into()));
    }
    get_comment(conn, id)
}

pub fn delete_comment(conn: &Connection, id: i64) -> AppResult<()> {
    let deleted = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(AppError::NotFound("Comment not found".into()));
    }
    Ok(())
}

fn post_from_row(row: &rusqlite::Row) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        author_id: row.get(1)?,
        title: row.get(2)?,
        content: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn comment_from_row(row: &rusqlite::Row) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        post_id: row.get(1)?,
        author_id: row.get(2)?,
        content: row.get(3)?,
        parent_id: row.get(4)?,
        created_at: row.get(5)?,
    })
}
