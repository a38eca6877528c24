use sqlx::SqlitePool;

use crate::{errors::RequestError, models::User};

use super::{find_user_by_username, get_user_by_id};

pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    password_hash: &str,
) -> Result<User, RequestError> {
    let mut tx = pool.begin().await?;
    let id = sqlx::query(
        r#"
        INSERT INTO users (username, password)
        VALUES ($1, $2)
        "#,
    )
    .bind(username)
    .bind(password_hash)
    .execute(&mut tx)
    .await?
    .last_insert_rowid();
    tx.commit().await?;

    get_user_by_id(pool, id)
        .await?
        .ok_or(RequestError::ServerError)
}

/// Removes a user together with everything that hangs off them: follow edges in both
/// directions, their comments, comments left on their posts, and their posts.
pub async fn delete_user_in_db(pool: &SqlitePool, username: &str) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;
    let user = find_user_by_username(&mut tx, username)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;

    let follows = sqlx::query("DELETE FROM follows WHERE user_id = $1 OR author_id = $1")
        .bind(user.id)
        .execute(&mut tx)
        .await?
        .rows_affected();
    let comments = sqlx::query(
        r#"
        DELETE FROM comments
        WHERE author_id = $1
           OR post_id IN (SELECT id FROM posts WHERE author_id = $1)
        "#,
    )
    .bind(user.id)
    .execute(&mut tx)
    .await?
    .rows_affected();
    let posts = sqlx::query("DELETE FROM posts WHERE author_id = $1")
        .bind(user.id)
        .execute(&mut tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user.id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;

    tracing::info!(
        username,
        posts,
        comments,
        follows,
        "deleted user and dependent records"
    );
    Ok(())
}
