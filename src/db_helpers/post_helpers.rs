use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    data_formats::{CleanPost, INVALID_CHOICE},
    errors::RequestError,
    models::{Comment, Post},
};

use super::{
    find_group_by_id, find_group_by_slug, find_user_by_username, get_comments_for_post_in_db,
};

/// Number of characters shown as the title of the post detail page.
pub const PREVIEW_LENGTH: usize = 30;

const POST_QUERY: &str = r#"
            SELECT posts.id            AS "id",
                   posts.text          AS "text",
                   posts.created_at    AS "created_at",
                   posts.author_id     AS "author_id",
                   users.username      AS "author_username",
                   posts.group_id      AS "group_id",
                   post_groups.slug    AS "group_slug",
                   post_groups.title   AS "group_title",
                   posts.image         AS "image"
            FROM   posts
                JOIN users
                    ON users.id = posts.author_id
                LEFT JOIN post_groups
                    ON post_groups.id = posts.group_id
"#;

const NEWEST_FIRST: &str = "ORDER BY posts.created_at DESC, posts.id DESC";

/// Which posts a listing shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Group(String),
    Author(String),
    /// Posts by every author the given user follows.
    FollowedBy(i64),
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: Post,
    pub comments: Vec<Comment>,
    pub preview: String,
}

async fn find_post_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Post>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let query = format!("{POST_QUERY} WHERE posts.id = $1");
    sqlx::query_as::<Sqlite, Post>(&query)
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Lists posts newest first. Fails with `NotFound` when the filter names a group or author
/// that does not exist.
pub async fn list_posts_in_db(
    pool: &SqlitePool,
    filter: &PostFilter,
) -> Result<Vec<Post>, RequestError> {
    let mut tx = pool.begin().await?;
    let (condition, id) = match filter {
        PostFilter::All => (None, None),
        PostFilter::Group(slug) => {
            let group = find_group_by_slug(&mut tx, slug)
                .await?
                .ok_or(RequestError::NotFound("Group not found"))?;
            (Some("WHERE posts.group_id = $1"), Some(group.id))
        }
        PostFilter::Author(username) => {
            let author = find_user_by_username(&mut tx, username)
                .await?
                .ok_or(RequestError::NotFound("User not found"))?;
            (Some("WHERE posts.author_id = $1"), Some(author.id))
        }
        PostFilter::FollowedBy(user_id) => (
            Some("WHERE posts.author_id IN (SELECT author_id FROM follows WHERE user_id = $1)"),
            Some(*user_id),
        ),
    };

    let query = format!("{POST_QUERY} {} {NEWEST_FIRST}", condition.unwrap_or_default());
    let mut query = sqlx::query_as::<Sqlite, Post>(&query);
    if let Some(id) = id {
        query = query.bind(id);
    }
    let result = query.fetch_all(&mut tx).await?;
    tx.commit().await?;
    Ok(result)
}

pub async fn get_post_by_id_in_db(pool: &SqlitePool, id: i64) -> Result<Post, RequestError> {
    let mut tx = pool.begin().await?;
    let result = find_post_by_id(&mut tx, id).await?;
    tx.commit().await?;
    result.ok_or(RequestError::NotFound("Post not found"))
}

/// A post with its comments (newest first) and a short preview of its text.
pub async fn get_post_detail_in_db(
    pool: &SqlitePool,
    id: i64,
) -> Result<PostDetail, RequestError> {
    let post = get_post_by_id_in_db(pool, id).await?;
    let comments = get_comments_for_post_in_db(pool, id).await?;
    let preview = post.preview(PREVIEW_LENGTH);
    Ok(PostDetail {
        post,
        comments,
        preview,
    })
}

pub async fn count_posts_by_author_in_db(
    pool: &SqlitePool,
    author_id: i64,
) -> Result<i64, RequestError> {
    let mut tx = pool.begin().await?;
    let count = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM posts WHERE author_id = $1")
        .bind(author_id)
        .fetch_one(&mut tx)
        .await?;
    tx.commit().await?;
    Ok(count)
}

pub async fn count_posts_in_db(pool: &SqlitePool) -> Result<i64, RequestError> {
    let count = sqlx::query_scalar::<Sqlite, i64>("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

pub async fn create_post_in_db(
    pool: &SqlitePool,
    author_id: i64,
    CleanPost { text, group_id }: CleanPost,
    image: Option<String>,
) -> Result<Post, RequestError> {
    let mut tx = pool.begin().await?;
    if let Some(group_id) = group_id {
        if find_group_by_id(&mut tx, group_id).await?.is_none() {
            return Err(RequestError::validation("group", INVALID_CHOICE));
        }
    }

    let id = sqlx::query(
        r#"
        INSERT INTO posts (text, created_at, author_id, group_id, image)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(text)
    .bind(chrono::Utc::now().naive_utc())
    .bind(author_id)
    .bind(group_id)
    .bind(image)
    .execute(&mut tx)
    .await?
    .last_insert_rowid();

    let post = find_post_by_id(&mut tx, id)
        .await?
        .ok_or(RequestError::ServerError)?;
    tx.commit().await?;
    tracing::info!(post_id = post.id, author = %post.author_username, "created post");
    Ok(post)
}

/// Replaces the text and group of a post. Only the author may do this; anyone else gets
/// `PermissionDenied` pointing back at the post. The creation time never changes, and the
/// stored image is kept unless a new one is given.
pub async fn edit_post_in_db(
    pool: &SqlitePool,
    editor_id: i64,
    post_id: i64,
    CleanPost { text, group_id }: CleanPost,
    image: Option<String>,
) -> Result<Post, RequestError> {
    let mut tx = pool.begin().await?;
    let post = find_post_by_id(&mut tx, post_id)
        .await?
        .ok_or(RequestError::NotFound("Post not found"))?;
    if post.author_id != editor_id {
        tracing::debug!(post_id, editor_id, "non-author edit deflected");
        return Err(RequestError::PermissionDenied {
            redirect_to: format!("/posts/{}/", post_id),
        });
    }
    if let Some(group_id) = group_id {
        if find_group_by_id(&mut tx, group_id).await?.is_none() {
            return Err(RequestError::validation("group", INVALID_CHOICE));
        }
    }

    sqlx::query(
        r#"
        UPDATE posts
        SET text = $1, group_id = $2, image = COALESCE($3, image)
        WHERE id = $4
        "#,
    )
    .bind(text)
    .bind(group_id)
    .bind(image)
    .bind(post_id)
    .execute(&mut tx)
    .await?;

    let post = find_post_by_id(&mut tx, post_id)
        .await?
        .ok_or(RequestError::ServerError)?;
    tx.commit().await?;
    Ok(post)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_helpers::{
        follow_user_in_db,
        test_support::{group, post, test_pool, user},
    };

    fn clean(text: &str, group_id: Option<i64>) -> CleanPost {
        CleanPost {
            text: text.to_owned(),
            group_id,
        }
    }

    #[tokio::test]
    async fn global_listing_is_newest_first() {
        let (_dir, pool) = test_pool().await;
        let user_1 = user(&pool, "test_auth_1").await;
        let user_2 = user(&pool, "test_auth_2").await;
        let group_1 = group(&pool, "group1").await;
        let group_2 = group(&pool, "group2").await;
        for i in 0..5 {
            post(&pool, &user_1, &format!("Automatic post text {i}"), Some(&group_1)).await;
        }
        let last = post(&pool, &user_2, "Test post text 5", Some(&group_2)).await;

        let posts = list_posts_in_db(&pool, &PostFilter::All).await.unwrap();
        assert_eq!(posts.len(), 6);
        assert_eq!(posts[0].id, last.id);
        assert_eq!(posts[0].author_username, "test_auth_2");
        assert_eq!(posts[0].group_slug.as_deref(), Some("group2"));
        assert_eq!(posts[0].created_at, last.created_at);
        assert!(posts.windows(2).all(|w| w[0].created_at >= w[1].created_at));
    }

    #[tokio::test]
    async fn filters_by_group_and_author() {
        let (_dir, pool) = test_pool().await;
        let user_1 = user(&pool, "test_auth_1").await;
        let user_2 = user(&pool, "test_auth_2").await;
        let group_1 = group(&pool, "group1").await;
        let group_2 = group(&pool, "group2").await;
        for i in 0..5 {
            post(&pool, &user_1, &format!("post {i}"), Some(&group_1)).await;
        }
        post(&pool, &user_2, "other", Some(&group_2)).await;

        let by_group = list_posts_in_db(&pool, &PostFilter::Group("group1".into()))
            .await
            .unwrap();
        assert_eq!(by_group.len(), 5);
        assert!(by_group.iter().all(|p| p.group_id == Some(group_1.id)));

        let by_author = list_posts_in_db(&pool, &PostFilter::Author("test_auth_2".into()))
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(count_posts_by_author_in_db(&pool, user_1.id).await.unwrap(), 5);
        assert_eq!(count_posts_in_db(&pool).await.unwrap(), 6);
    }

    #[tokio::test]
    async fn unknown_group_or_author_is_not_found() {
        let (_dir, pool) = test_pool().await;
        assert!(matches!(
            list_posts_in_db(&pool, &PostFilter::Group("nope".into())).await,
            Err(RequestError::NotFound(_))
        ));
        assert!(matches!(
            list_posts_in_db(&pool, &PostFilter::Author("nobody".into())).await,
            Err(RequestError::NotFound(_))
        ));
        assert!(matches!(
            get_post_by_id_in_db(&pool, 42).await,
            Err(RequestError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn follow_feed_only_has_followed_authors() {
        let (_dir, pool) = test_pool().await;
        let follower = user(&pool, "user_follower").await;
        let loner = user(&pool, "user_not_follower").await;
        let author = user(&pool, "some_author").await;
        let stranger = user(&pool, "stranger").await;
        post(&pool, &stranger, "not followed", None).await;
        follow_user_in_db(&pool, follower.id, "some_author").await.unwrap();
        let followed_post = post(&pool, &author, "for followers", None).await;

        let feed = list_posts_in_db(&pool, &PostFilter::FollowedBy(follower.id))
            .await
            .unwrap();
        assert_eq!(feed.len(), 1);
        assert_eq!(feed[0].id, followed_post.id);

        let empty = list_posts_in_db(&pool, &PostFilter::FollowedBy(loner.id))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn create_rejects_unknown_group() {
        let (_dir, pool) = test_pool().await;
        let author = user(&pool, "test_author").await;
        let result = create_post_in_db(&pool, author.id, clean("text", Some(99)), None).await;
        assert!(matches!(result, Err(RequestError::Validation(_))));
        assert!(list_posts_in_db(&pool, &PostFilter::All).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn author_can_edit_but_creation_time_is_fixed() {
        let (_dir, pool) = test_pool().await;
        let author = user(&pool, "test_author").await;
        let group_1 = group(&pool, "group1").await;
        let original = create_post_in_db(
            &pool,
            author.id,
            clean("original", None),
            Some("posts/a.gif".into()),
        )
        .await
        .unwrap();

        let edited = edit_post_in_db(
            &pool,
            author.id,
            original.id,
            clean("edited", Some(group_1.id)),
            None,
        )
        .await
        .unwrap();
        assert_eq!(edited.text, "edited");
        assert_eq!(edited.group_id, Some(group_1.id));
        assert_eq!(edited.created_at, original.created_at);
        assert_eq!(edited.image.as_deref(), Some("posts/a.gif"));
    }

    #[tokio::test]
    async fn non_author_edit_is_deflected_and_changes_nothing() {
        let (_dir, pool) = test_pool().await;
        let author = user(&pool, "test_author").await;
        let intruder = user(&pool, "intruder").await;
        let group_1 = group(&pool, "group1").await;
        let original = post(&pool, &author, "original", Some(&group_1)).await;

        let result = edit_post_in_db(
            &pool,
            intruder.id,
            original.id,
            clean("hijacked", None),
            None,
        )
        .await;
        match result {
            Err(RequestError::PermissionDenied { redirect_to }) => {
                assert_eq!(redirect_to, format!("/posts/{}/", original.id))
            }
            other => panic!("expected PermissionDenied, got {:?}", other),
        }

        let stored = get_post_by_id_in_db(&pool, original.id).await.unwrap();
        assert_eq!(stored.text, "original");
        assert_eq!(stored.group_id, Some(group_1.id));
    }

    #[tokio::test]
    async fn detail_has_preview_and_comments() {
        let (_dir, pool) = test_pool().await;
        let author = user(&pool, "test_author").await;
        let text = "A post long enough that its preview is cut short";
        let created = post(&pool, &author, text, None).await;

        let detail = get_post_detail_in_db(&pool, created.id).await.unwrap();
        assert_eq!(detail.preview, text.chars().take(PREVIEW_LENGTH).collect::<String>());
        assert!(detail.comments.is_empty());
    }
}
