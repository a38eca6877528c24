use std::sync::Arc;

use axum::{
    extract::{Multipart, Path, Query},
    http::{StatusCode, Uri},
    response::{IntoResponse, Redirect, Response},
    Extension, Form, Json,
};
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    authentication::{
        get_jwt_token, hash_password_argon2, verify_password_argon2, LoginRequired, MaybeUser,
    },
    cache::PageCache,
    config::Config,
    data_formats::{
        CleanPost, CommentRequest, CommentResponse, CredentialsRequest, GroupResponse,
        PageQueryParams, PageResponse, PostForm, PostFormResponse, PostResponse,
        ProfileResponse, Rendered, TokenWrapper, INVALID_CHOICE,
    },
    db_helpers::{
        add_comment_to_post_in_db, count_posts_by_author_in_db, count_posts_in_db,
        create_post_in_db, edit_post_in_db, follow_user_in_db, get_group_by_slug,
        get_post_by_id_in_db, get_post_detail_in_db, get_user_by_username, group_exists_in_db,
        insert_user, is_following_in_db, list_groups_in_db, list_posts_in_db,
        unfollow_user_in_db, PostFilter,
    },
    errors::{FormErrors, RequestError, NOT_FOUND_TEMPLATE},
    media::MediaStore,
    models::Post,
    pagination::{paginate, resolve_page_number},
};

const INDEX_TEMPLATE: &str = "posts/index.html";
const GROUP_LIST_TEMPLATE: &str = "posts/group_list.html";
const PROFILE_TEMPLATE: &str = "posts/profile.html";
const POST_DETAIL_TEMPLATE: &str = "posts/post_detail.html";
const CREATE_POST_TEMPLATE: &str = "posts/create_post.html";
const FOLLOW_TEMPLATE: &str = "posts/follow.html";
const LOGIN_TEMPLATE: &str = "users/login.html";
const SIGNUP_TEMPLATE: &str = "users/signup.html";

type Pool = Extension<Arc<SqlitePool>>;

type PageResult = Result<Rendered, RequestError>;
type RedirectResult = Result<Response, RequestError>;

fn post_url(post_id: i64) -> String {
    format!("/posts/{}/", post_id)
}

fn profile_url(username: &str) -> String {
    format!("/profile/{}/", username)
}

/// Post ids in paths are integers; anything else names no post.
fn parse_post_id(raw: &str) -> Result<i64, RequestError> {
    raw.parse().map_err(|_| RequestError::NotFound("Post not found"))
}

fn post_page(posts: Vec<Post>, page_number: usize, per_page: usize) -> PageResponse<PostResponse> {
    PageResponse::new(paginate(posts, page_number, per_page))
}

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> Rendered {
    tracing::debug!("no route for {}", uri);
    Rendered::new(NOT_FOUND_TEMPLATE, json!({ "path": uri.path() }))
        .with_status(StatusCode::NOT_FOUND)
}

// ----------------- Listing Handlers -----------------

/// The home listing. Its context is served from the page cache, so posts created within
/// the TTL show up only once the cached page expires.
pub async fn index(
    Extension(pool): Pool,
    Extension(config): Extension<Arc<Config>>,
    Extension(cache): Extension<Arc<PageCache>>,
    Query(params): Query<PageQueryParams>,
) -> PageResult {
    let pool: &SqlitePool = &pool;
    let per_page = config.records_per_page;
    // Keyed by the page actually served, so out-of-range numbers share the last page's entry.
    let count = usize::try_from(count_posts_in_db(pool).await?).unwrap_or(0);
    let page_number = resolve_page_number(params.page_number(), count, per_page);
    let key = format!("index:page:{}", page_number);
    let context = cache
        .get_or_try_insert_with(&key, move || async move {
            let posts = list_posts_in_db(pool, &PostFilter::All).await?;
            let page_obj = post_page(posts, page_number, per_page);
            Ok::<_, RequestError>(json!({ "page_obj": page_obj }))
        })
        .await?;
    Ok(Rendered::new(INDEX_TEMPLATE, context))
}

pub async fn group_posts(
    Extension(pool): Pool,
    Extension(config): Extension<Arc<Config>>,
    Path(slug): Path<String>,
    Query(params): Query<PageQueryParams>,
) -> PageResult {
    let group = get_group_by_slug(&pool, &slug).await?;
    let posts = list_posts_in_db(&pool, &PostFilter::Group(slug)).await?;
    let page_obj = post_page(posts, params.page_number(), config.records_per_page);
    Ok(Rendered::new(
        GROUP_LIST_TEMPLATE,
        json!({
            "group": GroupResponse::from(group),
            "page_obj": page_obj,
        }),
    ))
}

pub async fn profile(
    Extension(pool): Pool,
    Extension(config): Extension<Arc<Config>>,
    maybe_user: MaybeUser,
    Path(username): Path<String>,
    Query(params): Query<PageQueryParams>,
) -> PageResult {
    let selected_user = get_user_by_username(&pool, &username)
        .await?
        .ok_or(RequestError::NotFound("User not found"))?;
    let posts = list_posts_in_db(&pool, &PostFilter::Author(username)).await?;
    let count = count_posts_by_author_in_db(&pool, selected_user.id).await?;
    let following = match maybe_user.get_id() {
        Some(id) => is_following_in_db(&pool, id, selected_user.id).await?,
        None => false,
    };
    let page_obj = post_page(posts, params.page_number(), config.records_per_page);
    let selected_user = ProfileResponse {
        username: selected_user.username,
    };
    Ok(Rendered::new(
        PROFILE_TEMPLATE,
        json!({
            "selected_user": selected_user,
            "count": count,
            "page_obj": page_obj,
            "following": following,
        }),
    ))
}

pub async fn follow_index(
    LoginRequired(user): LoginRequired,
    Extension(pool): Pool,
    Extension(config): Extension<Arc<Config>>,
    Query(params): Query<PageQueryParams>,
) -> PageResult {
    let posts = list_posts_in_db(&pool, &PostFilter::FollowedBy(user.id)).await?;
    let page_obj = post_page(posts, params.page_number(), config.records_per_page);
    Ok(Rendered::new(FOLLOW_TEMPLATE, json!({ "page_obj": page_obj })))
}

// ----------------- Post Handlers -----------------

pub async fn post_detail(Extension(pool): Pool, Path(post_id): Path<String>) -> PageResult {
    let post_id = parse_post_id(&post_id)?;
    let detail = get_post_detail_in_db(&pool, post_id).await?;
    let count = count_posts_by_author_in_db(&pool, detail.post.author_id).await?;
    let comments: Vec<CommentResponse> = detail.comments.into_iter().map(Into::into).collect();
    Ok(Rendered::new(
        POST_DETAIL_TEMPLATE,
        json!({
            "post": PostResponse::from(detail.post),
            "preview": detail.preview,
            "count": count,
            "form_comment": { "fields": { "text": "" } },
            "comments": comments,
        }),
    ))
}

fn post_form_page(form: PostFormResponse, edited: Option<i64>) -> Rendered {
    let context = match edited {
        Some(post_id) => json!({ "form": form, "is_edit": true, "post_id": post_id }),
        None => json!({ "form": form }),
    };
    Rendered::new(CREATE_POST_TEMPLATE, context)
}

async fn rerender_post_form(
    pool: &SqlitePool,
    form: &PostForm,
    errors: FormErrors,
    edited: Option<i64>,
) -> RedirectResult {
    let groups = list_groups_in_db(pool).await?;
    let form = PostFormResponse::new(groups).with_submission(form, errors);
    Ok(post_form_page(form, edited).into_response())
}

/// Field checks plus the one that needs storage: a chosen group must exist.
async fn clean_post_form(pool: &SqlitePool, form: &PostForm) -> Result<CleanPost, RequestError> {
    let clean = form.clean()?;
    if let Some(group_id) = clean.group_id {
        if !group_exists_in_db(pool, group_id).await? {
            return Err(RequestError::validation("group", INVALID_CHOICE));
        }
    }
    Ok(clean)
}

async fn store_image(media: &MediaStore, form: &PostForm) -> Result<Option<String>, RequestError> {
    match &form.image {
        Some(image) => {
            let path = media.save_post_image(image).await.map_err(|e| {
                tracing::error!("Failed to store image: {:#}", e);
                RequestError::ServerError
            })?;
            Ok(Some(path))
        }
        None => Ok(None),
    }
}

pub async fn post_create_form(
    LoginRequired(_user): LoginRequired,
    Extension(pool): Pool,
) -> PageResult {
    let groups = list_groups_in_db(&pool).await?;
    Ok(post_form_page(PostFormResponse::new(groups), None))
}

pub async fn post_create(
    LoginRequired(user): LoginRequired,
    Extension(pool): Pool,
    Extension(media): Extension<Arc<MediaStore>>,
    multipart: Multipart,
) -> RedirectResult {
    let form = PostForm::from_multipart(multipart).await?;
    let clean = match clean_post_form(&pool, &form).await {
        Ok(clean) => clean,
        Err(RequestError::Validation(errors)) => {
            return rerender_post_form(&pool, &form, errors, None).await
        }
        Err(e) => return Err(e),
    };

    let image = store_image(&media, &form).await?;
    match create_post_in_db(&pool, user.id, clean, image.clone()).await {
        Ok(_) => Ok(Redirect::to(&profile_url(&user.username)).into_response()),
        Err(e) => {
            if let Some(path) = &image {
                media.discard(path).await;
            }
            match e {
                RequestError::Validation(errors) => {
                    rerender_post_form(&pool, &form, errors, None).await
                }
                e => Err(e),
            }
        }
    }
}

pub async fn post_edit_form(
    LoginRequired(user): LoginRequired,
    Extension(pool): Pool,
    Path(post_id): Path<String>,
) -> RedirectResult {
    let post_id = parse_post_id(&post_id)?;
    let post = get_post_by_id_in_db(&pool, post_id).await?;
    if post.author_id != user.id {
        return Ok(Redirect::to(&post_url(post_id)).into_response());
    }
    let groups = list_groups_in_db(&pool).await?;
    let form = PostFormResponse::new(groups).with_post(&post);
    Ok(post_form_page(form, Some(post_id)).into_response())
}

pub async fn post_edit(
    LoginRequired(user): LoginRequired,
    Extension(pool): Pool,
    Extension(media): Extension<Arc<MediaStore>>,
    Path(post_id): Path<String>,
    multipart: Multipart,
) -> RedirectResult {
    let post_id = parse_post_id(&post_id)?;
    let post = get_post_by_id_in_db(&pool, post_id).await?;
    if post.author_id != user.id {
        return Ok(Redirect::to(&post_url(post_id)).into_response());
    }

    let form = PostForm::from_multipart(multipart).await?;
    let clean = match clean_post_form(&pool, &form).await {
        Ok(clean) => clean,
        Err(RequestError::Validation(errors)) => {
            return rerender_post_form(&pool, &form, errors, Some(post_id)).await
        }
        Err(e) => return Err(e),
    };

    let image = store_image(&media, &form).await?;
    match edit_post_in_db(&pool, user.id, post_id, clean, image.clone()).await {
        Ok(_) => Ok(Redirect::to(&post_url(post_id)).into_response()),
        Err(e) => {
            if let Some(path) = &image {
                media.discard(path).await;
            }
            match e {
                RequestError::Validation(errors) => {
                    rerender_post_form(&pool, &form, errors, Some(post_id)).await
                }
                e => Err(e),
            }
        }
    }
}

// ----------------- Comment Handlers -----------------

pub async fn add_comment(
    LoginRequired(user): LoginRequired,
    Extension(pool): Pool,
    Path(post_id): Path<String>,
    Form(CommentRequest { text }): Form<CommentRequest>,
) -> RedirectResult {
    let post_id = parse_post_id(&post_id)?;
    match add_comment_to_post_in_db(&pool, user.id, post_id, &text).await {
        Ok(comment) => tracing::debug!(comment_id = comment.id, post_id, "added comment"),
        Err(RequestError::Validation(_)) => tracing::debug!(post_id, "rejected empty comment"),
        Err(e) => return Err(e),
    }
    Ok(Redirect::to(&post_url(post_id)).into_response())
}

// ----------------- Follow Handlers -----------------

pub async fn profile_follow(
    LoginRequired(user): LoginRequired,
    Extension(pool): Pool,
    Path(username): Path<String>,
) -> RedirectResult {
    let author = follow_user_in_db(&pool, user.id, &username).await?;
    Ok(Redirect::to(&profile_url(&author.username)).into_response())
}

pub async fn profile_unfollow(
    LoginRequired(user): LoginRequired,
    Extension(pool): Pool,
    Path(username): Path<String>,
) -> RedirectResult {
    let author = unfollow_user_in_db(&pool, user.id, &username).await?;
    Ok(Redirect::to(&profile_url(&author.username)).into_response())
}

// ----------------- User Handlers -----------------

fn credentials_page(template: &'static str, username: &str, errors: &FormErrors) -> Response {
    Rendered::new(
        template,
        json!({ "form": { "fields": { "username": username }, "errors": errors } }),
    )
    .into_response()
}

pub async fn signup_form() -> Rendered {
    Rendered::new(SIGNUP_TEMPLATE, json!({ "form": { "errors": {} } }))
}

pub async fn signup(
    Extension(pool): Pool,
    Extension(config): Extension<Arc<Config>>,
    Form(request): Form<CredentialsRequest>,
) -> RedirectResult {
    if let Err(RequestError::Validation(errors)) = request.validate() {
        return Ok(credentials_page(SIGNUP_TEMPLATE, &request.username, &errors));
    }

    let password = hash_password_argon2(request.password).await.map_err(|e| {
        tracing::error!("Could not hash password: {:#}", e);
        RequestError::ServerError
    })?;
    let user = match insert_user(&pool, &request.username, &password).await {
        Ok(user) => user,
        Err(RequestError::DatabaseError(sqlx::Error::Database(e)))
            if e.message().contains("UNIQUE constraint failed") =>
        {
            let mut errors = FormErrors::new();
            errors
                .entry("username")
                .or_default()
                .push("A user with that username already exists.".to_owned());
            return Ok(credentials_page(SIGNUP_TEMPLATE, &request.username, &errors));
        }
        Err(e) => return Err(e),
    };
    tracing::info!(username = %user.username, "registered user");

    let token = get_jwt_token(user.id, &config.jwt_secret).map_err(|e| {
        tracing::error!("Could not generate JWT: {:#}", e);
        RequestError::ServerError
    })?;
    Ok((
        StatusCode::CREATED,
        Json(TokenWrapper {
            username: user.username,
            token,
        }),
    )
        .into_response())
}

pub async fn login_form() -> Rendered {
    Rendered::new(LOGIN_TEMPLATE, json!({ "form": { "errors": {} } }))
}

pub async fn login(
    Extension(pool): Pool,
    Extension(config): Extension<Arc<Config>>,
    Form(request): Form<CredentialsRequest>,
) -> RedirectResult {
    if let Err(RequestError::Validation(errors)) = request.validate() {
        return Ok(credentials_page(LOGIN_TEMPLATE, &request.username, &errors));
    }

    let user = get_user_by_username(&pool, &request.username).await?;
    let is_password_correct = match &user {
        Some(user) => verify_password_argon2(request.password, &user.password)
            .await
            .map_err(|e| {
                tracing::error!("Could not verify password: {:#}", e);
                RequestError::ServerError
            })?,
        None => false,
    };
    let user = match user {
        Some(user) if is_password_correct => user,
        _ => {
            let mut errors = FormErrors::new();
            errors
                .entry("__all__")
                .or_default()
                .push("Please enter a correct username and password.".to_owned());
            return Ok(credentials_page(LOGIN_TEMPLATE, &request.username, &errors));
        }
    };

    let token = get_jwt_token(user.id, &config.jwt_secret).map_err(|e| {
        tracing::error!("Could not generate JWT: {:#}", e);
        RequestError::ServerError
    })?;
    Ok(Json(TokenWrapper {
        username: user.username,
        token,
    })
    .into_response())
}
