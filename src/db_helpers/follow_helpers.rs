use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::User};

use super::find_user_by_username;

pub async fn is_following_in_db(
    pool: &SqlitePool,
    follower_id: i64,
    author_id: i64,
) -> Result<bool, RequestError> {
    let mut tx = pool.begin().await?;
    let result = sqlx::query_scalar::<Sqlite, bool>(
        r#"
        SELECT EXISTS (SELECT 1 FROM follows WHERE user_id = $1 AND author_id = $2)
        "#,
    )
    .bind(follower_id)
    .bind(author_id)
    .fetch_one(&mut tx)
    .await?;
    tx.commit().await?;
    Ok(result)
}

/// Makes `follower_id` follow `username`. Following yourself, or someone you already
/// follow, changes nothing. Returns the author.
pub async fn follow_user_in_db(
    pool: &SqlitePool,
    follower_id: i64,
    username: &str,
) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let author = find_user_by_username(&mut tx, username)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    if author.id == follower_id {
        tracing::debug!(username, "ignoring self-follow");
        return Ok(author);
    }

    // The unique (user_id, author_id) constraint turns a concurrent duplicate into a no-op.
    let inserted = sqlx::query(
        r#"
        INSERT OR IGNORE INTO follows (user_id, author_id)
        VALUES ($1, $2)
        "#,
    )
    .bind(follower_id)
    .bind(author.id)
    .execute(&mut tx)
    .await?
    .rows_affected();
    tx.commit().await?;

    if inserted == 0 {
        tracing::debug!(follower_id, username, "already following");
    }
    Ok(author)
}

/// Removes the follow edge if there is one. Returns the author.
pub async fn unfollow_user_in_db(
    pool: &SqlitePool,
    follower_id: i64,
    username: &str,
) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let author = find_user_by_username(&mut tx, username)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;

    sqlx::query(
        r#"
        DELETE FROM follows WHERE user_id = $1 AND author_id = $2
        "#,
    )
    .bind(follower_id)
    .bind(author.id)
    .execute(&mut tx)
    .await?;
    tx.commit().await?;

    Ok(author)
}
