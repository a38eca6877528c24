#![allow(dead_code)]

use std::time::Duration;

use reqwest::{redirect::Policy, Client, Response, StatusCode};
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use yatube::{
    db_helpers::{create_post_in_db, get_user_by_username, insert_group, NewGroup},
    get_random_free_port, init_db, make_router,
    models::{Group, Post},
    run_app, CleanPost, Config, RenderedWrapper, TokenWrapper,
};

pub const TEST_SECRET: &str = "test-secret";

pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub pool: SqlitePool,
    pub dir: TempDir,
}

/// Runs the real server on a free port against a database in a fresh directory.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

pub async fn spawn_app_with_ttl(ttl: Duration) -> TestApp {
    spawn_app_with(move |config| config.index_cache_ttl = ttl).await
}

/// Like `spawn_app`, with `configure` applied on top of the default configuration.
pub async fn spawn_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let dir = tempfile::tempdir().expect("tempdir");
    let db_url = format!("sqlite://{}", dir.path().join("yatube.db").display());
    let pool = init_db(&db_url).await.expect("init db");

    let (_, addr) = get_random_free_port().expect("free port");
    let mut config = Config::new(db_url, TEST_SECRET);
    config.bind_address = addr;
    config.media_root = dir.path().join("media");
    configure(&mut config);
    tokio::spawn(run_app(make_router(), config));

    let client = Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("client");
    let address = format!("http://{}", addr);
    for _ in 0..50 {
        if client
            .get(format!("{}/check_health", address))
            .send()
            .await
            .is_ok()
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    TestApp {
        address,
        client,
        pool,
        dir,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a user over HTTP and returns their token.
    pub async fn signup(&self, username: &str) -> String {
        let response = self
            .client
            .post(self.url("/auth/signup/"))
            .form(&[("username", username), ("password", "correct horse")])
            .send()
            .await
            .expect("signup request");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body: TokenWrapper = response.json().await.expect("token body");
        body.token
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Response {
        let mut request = self.client.get(self.url(path));
        if let Some(token) = token {
            request = request.header("Authorization", format!("Token {}", token));
        }
        request.send().await.expect("GET request")
    }

    pub async fn page(&self, path: &str, token: Option<&str>) -> RenderedWrapper {
        let response = self.get(path, token).await;
        assert!(
            response.status().is_success(),
            "GET {} returned {}",
            path,
            response.status()
        );
        response.json().await.expect("rendered body")
    }

    pub async fn group(&self, slug: &str) -> Group {
        insert_group(
            &self.pool,
            NewGroup {
                title: format!("Test group {}", slug),
                slug: slug.to_owned(),
                description: "Test description".to_owned(),
            },
        )
        .await
        .expect("insert group")
    }

    pub async fn post(&self, username: &str, text: &str, group: Option<&Group>) -> Post {
        let author = get_user_by_username(&self.pool, username)
            .await
            .expect("lookup author")
            .expect("author exists");
        let clean = CleanPost {
            text: text.to_owned(),
            group_id: group.map(|g| g.id),
        };
        create_post_in_db(&self.pool, author.id, clean, None)
            .await
            .expect("insert post")
    }
}

pub fn location(response: &Response) -> &str {
    response
        .headers()
        .get("location")
        .expect("redirect has a location")
        .to_str()
        .expect("ascii location")
}

pub fn object_list(page: &RenderedWrapper) -> &Vec<Value> {
    page.context["page_obj"]["object_list"]
        .as_array()
        .expect("page_obj.object_list is an array")
}
