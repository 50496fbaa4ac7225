//! Thread assembler: one post, its comment tree, and like counts as a
//! single self-contained document.
//!
//! All comments for the post are fetched in one ordered query and grouped
//! by parent id in memory, so query count for the tree shape does not grow
//! with depth. Rendering stops at two levels: top-level comments and their
//! direct replies. Deeper replies are stored with a correct parent chain
//! but are not rendered; this is a known rendering limitation, not a data
//! defect. Like counts are attached with one query per node.

use std::collections::HashMap;

use rusqlite::{params, Connection};
use serde::Serialize;

use crate::blog::reactions::{self, LikeTarget};
use crate::error::{AppError, AppResult};

/// Denormalized public author fields, embedded per node so the response
/// document is self-contained.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorSnapshot {
    pub name: Option<String>,
    pub role: Option<String>,
    pub avatar: String,
}

#[derive(Debug, Serialize)]
pub struct CommentNode {
    pub id: i64,
    pub post: i64,
    pub author: AuthorSnapshot,
    pub content: String,
    pub created_at: String,
    pub parent_comment: Option<i64>,
    pub like_count: i64,
    pub replies: Vec<CommentNode>,
}

#[derive(Debug, Serialize)]
pub struct PostDetail {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub author: AuthorSnapshot,
    pub created_at: String,
    pub comments: Vec<CommentNode>,
    pub post_likes: i64,
}

struct CommentRow {
    id: i64,
    post_id: i64,
    parent_id: Option<i64>,
    content: String,
    created_at: String,
    author: AuthorSnapshot,
}

/// Assemble the detail document for one post.
pub fn post_detail(conn: &Connection, post_id: i64) -> AppResult<PostDetail> {
    let post = query_post_with_author(conn, post_id)?;

    let rows = query_comment_rows(conn, post_id)?;

    // Group children by parent id; order within each bucket follows the
    // query's created_at ordering.
    let mut top_level: Vec<CommentRow> = Vec::new();
    let mut children: HashMap<i64, Vec<CommentRow>> = HashMap::new();
    for row in rows {
        match row.parent_id {
            None => top_level.push(row),
            Some(parent_id) => children.entry(parent_id).or_default().push(row),
        }
    }

    let mut comments = Vec::with_capacity(top_level.len());
    for row in top_level {
        let replies = children
            .remove(&row.id)
            .unwrap_or_default()
            .into_iter()
            .map(|reply| node_with_likes(conn, reply, Vec::new()))
            .collect::<AppResult<Vec<_>>>()?;
        comments.push(node_with_likes(conn, row, replies)?);
    }

    let post_likes = reactions::count_likes(conn, LikeTarget::Post(post_id))?;

    Ok(PostDetail {
        id: post.0,
        title: post.1,
        content: post.2,
        author: post.3,
        created_at: post.4,
        comments,
        post_likes,
    })
}

fn node_with_likes(
    conn: &Connection,
    row: CommentRow,
    replies: Vec<CommentNode>,
) -> AppResult<CommentNode> {
    let like_count = reactions::count_likes(conn, LikeTarget::Comment(row.id))?;
    Ok(CommentNode {
        id: row.id,
        post: row.post_id,
        author: row.author,
        content: row.content,
        created_at: row.created_at,
        parent_comment: row.parent_id,
        like_count,
        replies,
    })
}

fn query_post_with_author(
    conn: &Connection,
    post_id: i64,
) -> AppResult<(i64, String, String, AuthorSnapshot, String)> {
    let result = conn.query_row(
        "SELECT p.id, p.title, p.content, p.created_at, u.name, u.role, u.avatar
         FROM posts p
         JOIN users u ON u.id = p.author_id
         WHERE p.id = ?1",
        params![post_id],
        |row| {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                AuthorSnapshot {
                    name: row.get(4)?,
                    role: row.get(5)?,
                    avatar: row.get(6)?,
                },
                row.get(3)?,
            ))
        },
    );
    match result {
        Ok(post) => Ok(post),
        Err(rusqlite::Error::QueryReturnedNoRows) => {
            Err(AppError::NotFound("Post not found".into()))
        }
        Err(e) => Err(e.into()),
    }
}

fn query_comment_rows(conn: &Connection, post_id: i64) -> AppResult<Vec<CommentRow>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.post_id, c.parent_id, c.content, c.created_at,
                u.name, u.role, u.avatar
         FROM comments c
         JOIN users u ON u.id = c.author_id
         WHERE c.post_id = ?1
         ORDER BY c.created_at ASC, c.id ASC",
    )?;

    let rows = stmt
        .query_map(params![post_id], |row| {
            Ok(CommentRow {
                id: row.get(0)?,
                post_id: row.get(1)?,
                parent_id: row.get(2)?,
                content: row.get(3)?,
                created_at: row.get(4)?,
                author: AuthorSnapshot {
                    name: row.get(5)?,
                    role: row.get(6)?,
                    avatar: row.get(7)?,
                },
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows)
}
