use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::auth::require_user;
use crate::config::*;
use crate::core::collection::Collection;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, new_id, no_content, now, parse_body};
use crate::core::store::KvStore;
use crate::models::models::Comment;
use crate::posts::POSTS;

pub static COMMENTS: Collection<Comment> = Collection::new("comment", COMMENTS_LIST_KEY);

#[derive(Deserialize)]
struct CommentPayload {
    content: Option<String>,
}

fn clean_comment(content: Option<&str>) -> Result<String, ApiError> {
    let content = content.unwrap_or_default().trim().to_string();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Content is required".to_string()));
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_LENGTH
        )));
    }
    Ok(content)
}

fn require_post(store: &dyn KvStore, post_id: &str) -> Result<(), ApiError> {
    match POSTS.get(store, post_id)? {
        Some(_) => Ok(()),
        None => Err(ApiError::NotFound("Post not found".to_string())),
    }
}

/// Looks a comment up under its parent post.
fn comment_on_post(store: &dyn KvStore, post_id: &str, comment_id: &str) -> Result<Comment, ApiError> {
    COMMENTS
        .get(store, comment_id)?
        .filter(|c| c.post == post_id)
        .ok_or_else(|| ApiError::NotFound("Comment not found".to_string()))
}

fn authored_comment(
    store: &dyn KvStore,
    user_id: &str,
    post_id: &str,
    comment_id: &str,
) -> Result<Comment, ApiError> {
    let comment = comment_on_post(store, post_id, comment_id)?;
    if comment.user != user_id {
        return Err(ApiError::Forbidden(
            "You can only modify your own comments.".to_string(),
        ));
    }
    Ok(comment)
}

pub fn add_comment(store: &dyn KvStore, user_id: &str, post_id: &str, content: Option<&str>) -> Result<Comment, ApiError> {
    require_post(store, post_id)?;

    let comment = Comment {
        id: new_id(),
        user: user_id.to_string(),
        post: post_id.to_string(),
        content: clean_comment(content)?,
        created_at: now(),
        updated_at: None,
    };
    COMMENTS.insert(store, &comment)?;

    tracing::info!("User {} commented on post {}", user_id, post_id);
    Ok(comment)
}

pub fn remove_comment(store: &dyn KvStore, comment_id: &str) -> anyhow::Result<()> {
    COMMENTS.remove(store, comment_id)
}

// === HTTP Handlers ===

pub fn list_comments(store: &dyn KvStore, req: Request, post_id: &str) -> Result<Response, ApiError> {
    require_user(store, &req)?;
    require_post(store, post_id)?;

    let comments = COMMENTS.filter(store, |c| c.post == post_id)?;
    json_response(200, &comments)
}

pub fn create_comment(store: &dyn KvStore, req: Request, post_id: &str) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let payload: CommentPayload = parse_body(&req)?;
    let comment = add_comment(store, &user_id, post_id, payload.content.as_deref())?;

    json_response(201, &comment)
}

pub fn get_comment(store: &dyn KvStore, req: Request, post_id: &str, comment_id: &str) -> Result<Response, ApiError> {
    require_user(store, &req)?;
    json_response(200, &comment_on_post(store, post_id, comment_id)?)
}

pub fn update_comment(
    store: &dyn KvStore,
    req: Request,
    post_id: &str,
    comment_id: &str,
    partial: bool,
) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let mut comment = authored_comment(store, &user_id, post_id, comment_id)?;
    let payload: CommentPayload = parse_body(&req)?;

    if !partial || payload.content.is_some() {
        comment.content = clean_comment(payload.content.as_deref())?;
    }
    comment.updated_at = Some(now());
    COMMENTS.save(store, &comment)?;

    json_response(200, &comment)
}

pub fn delete_comment(store: &dyn KvStore, req: Request, post_id: &str, comment_id: &str) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let comment = authored_comment(store, &user_id, post_id, comment_id)?;
    remove_comment(store, &comment.id)?;

    Ok(no_content())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::testing::{call, register_and_login};
    use serde_json::json;
    use spin_sdk::http::Method;

    fn make_post(store: &MemoryStore, token: &str) -> String {
        let (_, body) = call(store, Method::Post, "/posts", Some(token), Some(json!({"content": "discuss"})));
        body["id"].as_str().unwrap().to_string()
    }

    #[test]
    fn comments_are_scoped_to_parent_post() {
        let store = MemoryStore::new();
        let (ann_id, ann) = register_and_login(&store, "ann@example.com");
        let first = make_post(&store, &ann);
        let second = make_post(&store, &ann);

        let url = format!("/posts/{}/comments", first);
        let (status, comment) = call(&store, Method::Post, &url, Some(&ann), Some(json!({"content": "1 < 2 & 3 > 2"})));
        assert_eq!(status, 201);
        assert_eq!(comment["user"], ann_id);
        assert_eq!(comment["post"], first);
        assert_eq!(comment["content"], "1 < 2 & 3 > 2");

        let (_, body) = call(&store, Method::Get, &url, Some(&ann), None);
        assert_eq!(body, json!([comment]));

        let (_, body) = call(&store, Method::Get, &format!("/posts/{}/comments", second), Some(&ann), None);
        assert_eq!(body, json!([]));

        let wrong_parent = format!("/posts/{}/comments/{}", second, comment["id"].as_str().unwrap());
        let (status, _) = call(&store, Method::Get, &wrong_parent, Some(&ann), None);
        assert_eq!(status, 404);
    }

    #[test]
    fn missing_post_and_empty_content() {
        let store = MemoryStore::new();
        let (_, ann) = register_and_login(&store, "ann@example.com");
        let (status, _) = call(&store, Method::Get, "/posts/ghost/comments", Some(&ann), None);
        assert_eq!(status, 404);
        let (status, _) = call(&store, Method::Post, "/posts/ghost/comments", Some(&ann), Some(json!({"content": "x"})));
        assert_eq!(status, 404);

        let post_id = make_post(&store, &ann);
        let (status, _) = call(
            &store,
            Method::Post,
            &format!("/posts/{}/comments", post_id),
            Some(&ann),
            Some(json!({"content": "   "})),
        );
        assert_eq!(status, 400);
    }

    #[test]
    fn only_author_can_edit_or_delete() {
        let store = MemoryStore::new();
        let (_, ann) = register_and_login(&store, "ann@example.com");
        let (_, bob) = register_and_login(&store, "bob@example.com");
        let post_id = make_post(&store, &ann);

        let (_, comment) = call(
            &store,
            Method::Post,
            &format!("/posts/{}/comments", post_id),
            Some(&bob),
            Some(json!({"content": "hello"})),
        );
        let url = format!("/posts/{}/comments/{}", post_id, comment["id"].as_str().unwrap());

        let (status, _) = call(&store, Method::Put, &url, Some(&ann), Some(json!({"content": "rewritten"})));
        assert_eq!(status, 403);
        let (status, _) = call(&store, Method::Delete, &url, Some(&ann), None);
        assert_eq!(status, 403);

        let (status, body) = call(&store, Method::Patch, &url, Some(&bob), Some(json!({"content": "edited"})));
        assert_eq!(status, 200);
        assert_eq!(body["content"], "edited");
        assert!(body["updated_at"].is_string());

        let (status, _) = call(&store, Method::Delete, &url, Some(&bob), None);
        assert_eq!(status, 204);
        assert!(COMMENTS.all(&store).unwrap().is_empty());
    }
}
