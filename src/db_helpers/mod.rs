use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    errors::RequestError,
    models::{Group, User},
};

mod comment_helpers;
mod follow_helpers;
mod group_helpers;
mod post_helpers;
mod user_helpers;

pub use comment_helpers::*;
pub use follow_helpers::*;
pub use group_helpers::*;
pub use post_helpers::*;
pub use user_helpers::*;

const USER_COLUMNS: &str = "id, username, password, created_at";
const GROUP_COLUMNS: &str = "id, title, slug, description";

// ----------------- Helper Functions -----------------

async fn find_user_by_username<'e, E>(
    executor: E,
    username: &str,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1");
    sqlx::query_as::<Sqlite, User>(&query)
        .bind(username)
        .fetch_optional(executor)
        .await
}

async fn find_group_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Group>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {GROUP_COLUMNS} FROM post_groups WHERE id = $1");
    sqlx::query_as::<Sqlite, Group>(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

async fn find_group_by_slug<'e, E>(executor: E, slug: &str) -> Result<Option<Group>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("SELECT {GROUP_COLUMNS} FROM post_groups WHERE slug = $1");
    sqlx::query_as::<Sqlite, Group>(&query)
        .bind(slug)
        .fetch_optional(executor)
        .await
}

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, RequestError> {
    let mut tx = pool.begin().await?;
    let result = find_user_by_username(&mut tx, username).await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let result = sqlx::query_as::<Sqlite, User>(&query)
        .bind(id)
        .fetch_optional(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn get_group_by_slug(pool: &SqlitePool, slug: &str) -> Result<Group, RequestError> {
    let mut tx = pool.begin().await?;
    let result = find_group_by_slug(&mut tx, slug).await?;
    tx.commit().await?;
    result.ok_or(RequestError::NotFound("Group not found"))
}

// ----------------- End Helper Functions -----------------
