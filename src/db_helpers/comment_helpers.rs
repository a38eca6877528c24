use sqlx::{Sqlite, SqlitePool};

use crate::{data_formats::REQUIRED_FIELD, errors::RequestError, models::Comment};

const COMMENT_QUERY: &str = r#"
            SELECT comments.id          AS "id",
                   comments.text        AS "text",
                   comments.created_at  AS "created_at",
                   comments.author_id   AS "author_id",
                   users.username       AS "author_username",
                   comments.post_id     AS "post_id"
            FROM   comments
                JOIN users
                    ON users.id = comments.author_id
"#;

pub async fn add_comment_to_post_in_db(
    pool: &SqlitePool,
    author_id: i64,
    post_id: i64,
    text: &str,
) -> Result<Comment, RequestError> {
    let mut tx = pool.begin().await?;
    let post = sqlx::query_scalar::<Sqlite, i64>("SELECT id FROM posts WHERE id = $1")
        .bind(post_id)
        .fetch_optional(&mut tx)
        .await?;
    if post.is_none() {
        return Err(RequestError::NotFound("Post not found"));
    }

    let text = text.trim();
    if text.is_empty() {
        return Err(RequestError::validation("text", REQUIRED_FIELD));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO comments (text, created_at, author_id, post_id)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(text)
    .bind(chrono::Utc::now().naive_utc())
    .bind(author_id)
    .bind(post_id)
    .execute(&mut tx)
    .await?
    .last_insert_rowid();

    let query = format!("{COMMENT_QUERY} WHERE comments.id = $1");
    let result = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn get_comments_for_post_in_db(
    pool: &SqlitePool,
    post_id: i64,
) -> Result<Vec<Comment>, RequestError> {
    let mut tx = pool.begin().await?;
    let query = format!(
        "{COMMENT_QUERY} WHERE comments.post_id = $1 \
         ORDER BY comments.created_at DESC, comments.id DESC"
    );
    let result = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(post_id)
        .fetch_all(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::test_support::{post, test_pool, user};

    #[tokio::test]
    async fn comments_are_newest_first() {
        let (_dir, pool) = test_pool().await;
        let author = user(&pool, "test_author").await;
        let commented = post(&pool, &author, "post", None).await;
        add_comment_to_post_in_db(&pool, author.id, commented.id, "first")
            .await
            .unwrap();
        let latest = add_comment_to_post_in_db(&pool, author.id, commented.id, "second")
            .await
            .unwrap();
        assert_eq!(latest.author_username, "test_author");

        let comments = get_comments_for_post_in_db(&pool, commented.id)
            .await
            .unwrap();
        let texts: Vec<_> = comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["second", "first"]);
    }

    #[tokio::test]
    async fn blank_comments_and_missing_posts_are_rejected() {
        let (_dir, pool) = test_pool().await;
        let author = user(&pool, "test_author").await;
        let commented = post(&pool, &author, "post", None).await;

        assert!(matches!(
            add_comment_to_post_in_db(&pool, author.id, commented.id, "  ").await,
            Err(RequestError::Validation(_))
        ));
        assert!(matches!(
            add_comment_to_post_in_db(&pool, author.id, 999, "hello").await,
            Err(RequestError::NotFound(_))
        ));
        assert!(get_comments_for_post_in_db(&pool, commented.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn missing_post_wins_over_blank_text() {
        let (_dir, pool) = test_pool().await;
        let author = user(&pool, "test_author").await;

        assert!(matches!(
            add_comment_to_post_in_db(&pool, author.id, 999, "  ").await,
            Err(RequestError::NotFound(_))
        ));
    }
}
