mod common;

use common::{location, object_list, spawn_app};
use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn public_pages_use_their_templates() {
    let app = spawn_app().await;
    let token = app.signup("auth").await;
    let group = app.group("test-slug").await;
    let post = app.post("auth", "Тестовый текст поста", Some(&group)).await;

    let cases = [
        ("/".to_owned(), "posts/index.html"),
        ("/group/test-slug/".to_owned(), "posts/group_list.html"),
        ("/profile/auth/".to_owned(), "posts/profile.html"),
        (format!("/posts/{}/", post.id), "posts/post_detail.html"),
    ];
    for (path, template) in cases {
        let page = app.page(&path, None).await;
        assert_eq!(page.template, template, "{}", path);
        assert!(page.context.contains_key("year"), "{} has no year", path);
    }

    let page = app.page("/create/", Some(&token)).await;
    assert_eq!(page.template, "posts/create_post.html");
    let page = app.page(&format!("/posts/{}/edit/", post.id), Some(&token)).await;
    assert_eq!(page.template, "posts/create_post.html");
    assert_eq!(page.context["is_edit"], true);
    assert_eq!(page.context["form"]["fields"]["text"], "Тестовый текст поста");
}

#[tokio::test]
async fn unknown_pages_render_the_404_template() {
    let app = spawn_app().await;

    for path in ["/unexisting_page/", "/group/missing/", "/profile/nobody/", "/posts/999/", "/posts/abc/"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", path);
        let body: yatube::RenderedWrapper = response.json().await.unwrap();
        assert_eq!(body.template, "core/404.html");
    }
}

#[tokio::test]
async fn login_required_pages_redirect_guests() {
    let app = spawn_app().await;
    app.signup("auth").await;
    let post = app.post("auth", "Тестовый текст поста", None).await;

    let edit_path = format!("/posts/{}/edit/", post.id);
    for path in ["/create/", "/follow/", edit_path.as_str(), "/profile/auth/follow/"] {
        let response = app.get(path, None).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "{}", path);
        assert_eq!(location(&response), format!("/auth/login/?next={}", path));
    }

    let response = app.get("/follow/?page=2", None).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), "/auth/login/?next=/follow/%3Fpage%3D2");
}

#[tokio::test]
async fn detail_page_shows_the_post_and_author_count() {
    let app = spawn_app().await;
    app.signup("auth").await;
    let group = app.group("test-slug").await;
    app.post("auth", "first", None).await;
    let post = app.post("auth", "Тестовый.текст.поста", Some(&group)).await;

    let page = app.page(&format!("/posts/{}/", post.id), None).await;
    assert_eq!(page.context["post"]["id"], post.id);
    assert_eq!(page.context["post"]["author"]["username"], "auth");
    assert_eq!(page.context["post"]["group"]["slug"], "test-slug");
    assert_eq!(page.context["count"], 2);
    assert_eq!(page.context["preview"], "Тестовый.текст.поста");
    assert!(page.context["comments"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn listings_paginate_by_ten() {
    let app = spawn_app().await;
    app.signup("auth").await;
    app.signup("other").await;
    let group = app.group("test-slug").await;
    let other_group = app.group("other-slug").await;
    for i in 0..13 {
        app.post("auth", &format!("post {}", i), Some(&group)).await;
    }
    app.post("other", "elsewhere", Some(&other_group)).await;

    let cases = [
        ("/", 10, 4),
        ("/group/test-slug/", 10, 3),
        ("/profile/auth/", 10, 3),
    ];
    for (path, first, second) in cases {
        let page = app.page(path, None).await;
        assert_eq!(object_list(&page).len(), first, "{}", path);
        let page = app.page(&format!("{}?page=2", path), None).await;
        assert_eq!(object_list(&page).len(), second, "{}?page=2", path);
    }

    let page = app.page("/group/test-slug/?page=99", None).await;
    assert_eq!(page.context["page_obj"]["number"], 2);
    let page = app.page("/group/test-slug/?page=abc", None).await;
    assert_eq!(page.context["page_obj"]["number"], 1);
}

#[tokio::test]
async fn listings_are_newest_first_and_filtered() {
    let app = spawn_app().await;
    app.signup("auth").await;
    app.signup("other").await;
    let group = app.group("test-slug").await;
    let other_group = app.group("other-slug").await;
    let older = app.post("auth", "older", Some(&group)).await;
    let newer = app.post("auth", "newer", Some(&group)).await;
    let elsewhere = app.post("other", "elsewhere", Some(&other_group)).await;

    let page = app.page("/", None).await;
    let ids: Vec<_> = object_list(&page).iter().map(|p| p["id"].clone()).collect();
    assert_eq!(ids, vec![Value::from(elsewhere.id), newer.id.into(), older.id.into()]);

    let page = app.page("/group/test-slug/", None).await;
    assert_eq!(page.context["group"]["title"], "Test group test-slug");
    let ids: Vec<_> = object_list(&page).iter().map(|p| p["id"].clone()).collect();
    assert_eq!(ids, vec![Value::from(newer.id), older.id.into()]);

    let page = app.page("/group/other-slug/", None).await;
    assert_eq!(object_list(&page).len(), 1);
    assert_eq!(object_list(&page)[0]["text"], "elsewhere");
}
