use serde::{Deserialize, Serialize};

use crate::{
    errors::FormErrors,
    models::{Comment, Group, Post},
    pagination::Page,
};

use super::PostForm;

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ProfileResponse {
    pub username: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupResponse {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub description: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupRefResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PostResponse {
    pub id: i64,
    pub text: String,
    pub pub_date: String,
    pub author: ProfileResponse,
    pub group: Option<GroupRefResponse>,
    pub image: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
pub struct CommentResponse {
    pub id: i64,
    pub text: String,
    pub created: String,
    pub author: ProfileResponse,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct PageResponse<T> {
    pub object_list: Vec<T>,
    pub number: usize,
    pub num_pages: usize,
    pub count: usize,
    pub has_next: bool,
    pub has_previous: bool,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
pub struct PostFormFields {
    pub text: String,
    pub group: Option<String>,
    pub image: Option<String>,
}

#[derive(Serialize, Debug, Clone, Default)]
pub struct PostFormResponse {
    pub fields: PostFormFields,
    pub groups: Vec<GroupRefResponse>,
    pub errors: FormErrors,
}

impl From<Group> for GroupResponse {
    fn from(
        Group {
            id,
            title,
            slug,
            description,
        }: Group,
    ) -> Self {
        GroupResponse {
            id,
            title,
            slug,
            description,
        }
    }
}

impl From<Group> for GroupRefResponse {
    fn from(Group { id, title, slug, .. }: Group) -> Self {
        GroupRefResponse { id, slug, title }
    }
}

impl From<Post> for PostResponse {
    fn from(
        Post {
            id,
            text,
            created_at,
            author_username,
            group_id,
            group_slug,
            group_title,
            image,
            ..
        }: Post,
    ) -> Self {
        let group = match (group_id, group_slug, group_title) {
            (Some(id), Some(slug), Some(title)) => Some(GroupRefResponse { id, slug, title }),
            _ => None,
        };
        PostResponse {
            id,
            text,
            pub_date: created_at.to_string(),
            author: ProfileResponse {
                username: author_username,
            },
            group,
            image,
        }
    }
}

impl From<Comment> for CommentResponse {
    fn from(
        Comment {
            id,
            text,
            created_at,
            author_username,
            ..
        }: Comment,
    ) -> Self {
        CommentResponse {
            id,
            text,
            created: created_at.to_string(),
            author: ProfileResponse {
                username: author_username,
            },
        }
    }
}

impl<T> PageResponse<T> {
    pub fn new<U: Into<T>>(page: Page<U>) -> Self {
        let has_next = page.has_next();
        let has_previous = page.has_previous();
        let page: Page<T> = page.map(Into::into);
        PageResponse {
            object_list: page.object_list,
            number: page.number,
            num_pages: page.num_pages,
            count: page.count,
            has_next,
            has_previous,
        }
    }
}

impl PostFormResponse {
    pub fn new(groups: Vec<Group>) -> Self {
        PostFormResponse {
            groups: groups.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Prefills the form with a stored post, for the edit view.
    pub fn with_post(mut self, post: &Post) -> Self {
        self.fields = PostFormFields {
            text: post.text.clone(),
            group: post.group_id.map(|id| id.to_string()),
            image: post.image.clone(),
        };
        self
    }

    /// Echoes a rejected submission back together with its errors.
    pub fn with_submission(mut self, form: &PostForm, errors: FormErrors) -> Self {
        self.fields = PostFormFields {
            text: form.text.clone(),
            group: form.group.clone(),
            image: form.image.as_ref().map(|image| image.file_name.clone()),
        };
        self.errors = errors;
        self
    }
}
