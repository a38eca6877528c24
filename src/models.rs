use std::fmt;

use chrono::NaiveDateTime;

/// Number of characters a post shows when displayed as a single line.
const POST_DISPLAY_LENGTH: usize = 15;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Group {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

/// A post row joined with the author's username and the group it belongs to, if any.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub text: String,
    pub created_at: NaiveDateTime,
    pub author_id: i64,
    pub author_username: String,
    pub group_id: Option<i64>,
    pub group_slug: Option<String>,
    pub group_title: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub text: String,
    pub created_at: NaiveDateTime,
    pub author_id: i64,
    pub author_username: String,
    pub post_id: i64,
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.title)
    }
}

impl fmt::Display for Post {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&truncate_chars(&self.text, POST_DISPLAY_LENGTH))
    }
}

impl Post {
    /// The first `length` characters of the text, used as the page title on the detail view.
    pub fn preview(&self, length: usize) -> String {
        truncate_chars(&self.text, length)
    }
}

fn truncate_chars(text: &str, length: usize) -> String {
    text.chars().take(length).collect()
}
