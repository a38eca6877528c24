mod authentication;
pub mod cache;
pub mod config;
mod data_formats;
pub mod db_helpers;
pub mod errors;
mod handlers;
pub mod media;
pub mod models;
pub mod pagination;

use anyhow::Context;
pub use anyhow::Result;
use axum::{routing::*, Extension, Router};
use cache::PageCache;
pub use config::Config;
pub use data_formats::*;
use handlers::*;
use media::MediaStore;
use sqlx::{
    migrate::MigrateDatabase,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Sqlite, SqlitePool,
};
use std::{
    net::{SocketAddr, TcpListener},
    str::FromStr,
    sync::Arc,
};
use tower_http::trace::TraceLayer;

/// Connects to the database in `config`, attaches shared state to `app` and serves it on
/// `config.bind_address` until the server stops.
pub async fn run_app(app: Router, config: Config) -> Result<()> {
    let db = init_db(&config.database_url).await?;
    let address = config.bind_address;
    let app = attach_state(app, db, config);
    tracing::info!("Server started on {}", address);
    axum::Server::bind(&address)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}

pub fn attach_state(app: Router, db: SqlitePool, config: Config) -> Router {
    let cache = page_cache_for(&config);
    let media = MediaStore::new(config.media_root.clone());
    tracing::debug!(ttl = ?cache.ttl(), media_root = %media.root().display(), "app state ready");
    app.layer(Extension(Arc::new(db)))
        .layer(Extension(Arc::new(config)))
        .layer(Extension(Arc::new(cache)))
        .layer(Extension(Arc::new(media)))
        .layer(TraceLayer::new_for_http())
}

fn page_cache_for(config: &Config) -> PageCache {
    PageCache::new(config.index_cache_ttl)
}

pub async fn init_db(db_url: &str) -> Result<SqlitePool> {
    if !Sqlite::database_exists(db_url).await.unwrap_or(false) {
        tracing::info!("Creating database {}", db_url);
        Sqlite::create_database(db_url)
            .await
            .context("Failed to create database")?;
    } else {
        tracing::debug!("Database already exists");
    }
    let options = SqliteConnectOptions::from_str(db_url)?.foreign_keys(true);
    let pool = SqlitePoolOptions::new().connect_with(options).await?;
    tracing::debug!("Running Migrations");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::debug!("Migrations completed");
    Ok(pool)
}

pub fn get_random_free_port() -> Result<(u16, SocketAddr)> {
    let listener = TcpListener::bind("127.0.0.1:0").context("Could not bind a free port")?;
    let addr = listener
        .local_addr()
        .context("Could not get a free port")?;
    Ok((addr.port(), addr))
}

pub fn make_router() -> Router {
    Router::new()
        .route("/check_health", get(alive))
        .route("/", get(index))
        .route("/group/:slug/", get(group_posts))
        .route("/profile/:username/", get(profile))
        .route("/profile/:username/follow/", get(profile_follow))
        .route("/profile/:username/unfollow/", get(profile_unfollow))
        .route("/follow/", get(follow_index))
        .route("/create/", get(post_create_form).post(post_create))
        .route("/posts/:post_id/", get(post_detail))
        .route("/posts/:post_id/edit/", get(post_edit_form).post(post_edit))
        .route("/posts/:post_id/comment/", post(add_comment))
        .route("/auth/signup/", get(signup_form).post(signup))
        .route("/auth/login/", get(login_form).post(login))
        .fallback(not_found)
}
