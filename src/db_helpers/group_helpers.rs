use sqlx::{Sqlite, SqlitePool};

use crate::{
    errors::{FormErrors, RequestError},
    models::Group,
};

use super::{find_group_by_id, find_group_by_slug, GROUP_COLUMNS};

pub const GROUP_TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct NewGroup {
    pub title: String,
    pub slug: String,
    pub description: String,
}

impl NewGroup {
    fn validate(&self) -> Result<(), RequestError> {
        let mut errors = FormErrors::new();
        if self.title.trim().is_empty() {
            errors.entry("title").or_default().push("This field is required.".to_owned());
        } else if self.title.chars().count() > GROUP_TITLE_MAX_CHARS {
            errors.entry("title").or_default().push(format!(
                "Ensure this value has at most {} characters.",
                GROUP_TITLE_MAX_CHARS
            ));
        }
        if !is_valid_slug(&self.slug) {
            errors.entry("slug").or_default().push(
                "Enter a valid slug consisting of letters, numbers, underscores or hyphens."
                    .to_owned(),
            );
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(RequestError::Validation(errors))
        }
    }
}

pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub async fn insert_group(pool: &SqlitePool, group: NewGroup) -> Result<Group, RequestError> {
    group.validate()?;
    let mut tx = pool.begin().await?;
    let result = sqlx::query(
        r#"
        INSERT INTO post_groups (title, slug, description)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(&group.title)
    .bind(&group.slug)
    .bind(&group.description)
    .execute(&mut tx)
    .await
    .map_err(|e| {
        if let sqlx::Error::Database(db_error) = &e {
            if db_error.message().contains("UNIQUE constraint failed") {
                return RequestError::validation("slug", "Group with this slug already exists.");
            }
        }
        RequestError::DatabaseError(e)
    })?;
    let group = find_group_by_id(&mut tx, result.last_insert_rowid())
        .await?
        .ok_or(RequestError::ServerError)?;
    tx.commit().await?;
    Ok(group)
}

pub async fn list_groups_in_db(pool: &SqlitePool) -> Result<Vec<Group>, RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!("SELECT {GROUP_COLUMNS} FROM post_groups ORDER BY title");
    let result = sqlx::query_as::<Sqlite, Group>(&query)
        .fetch_all(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn group_exists_in_db(pool: &SqlitePool, id: i64) -> Result<bool, RequestError> {
    let mut tx = pool.begin().await?;
    let result = find_group_by_id(&mut tx, id).await?;
    tx.commit().await?;
    Ok(result.is_some())
}

/// Deletes a group. Its posts stay and lose their group. Returns how many posts were detached.
pub async fn delete_group_in_db(pool: &SqlitePool, slug: &str) -> Result<u64, RequestError> {
    let mut tx = pool.begin().await?;
    let group = find_group_by_slug(&mut tx, slug)
        .await?
        .ok_or(RequestError::NotFound("Group not found"))?;

    let detached = sqlx::query("UPDATE posts SET group_id = NULL WHERE group_id = $1")
        .bind(group.id)
        .execute(&mut tx)
        .await?
        .rows_affected();
    sqlx::query("DELETE FROM post_groups WHERE id = $1")
        .bind(group.id)
        .execute(&mut tx)
        .await?;
    tx.commit().await?;

    tracing::info!(slug, detached, "deleted group");
    Ok(detached)
}
