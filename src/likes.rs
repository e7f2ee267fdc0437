use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::auth::require_user;
use crate::config::*;
use crate::core::collection::{claim_unique, release_unique, Collection};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, new_id, no_content, now, parse_body};
use crate::core::store::KvStore;
use crate::models::models::Like;
use crate::posts::POSTS;

pub static LIKES: Collection<Like> = Collection::new("like", LIKES_LIST_KEY);

#[derive(Deserialize)]
struct NewLike {
    #[serde(default)]
    post: String,
}

/// Stores a like; the `(user, post)` pair is a unique key.
pub fn insert_like(store: &dyn KvStore, user_id: &str, post_id: &str) -> Result<Like, ApiError> {
    let like = Like {
        id: new_id(),
        user: user_id.to_string(),
        post: post_id.to_string(),
        created_at: now(),
    };

    if !claim_unique(store, &like_index_key(user_id, post_id), &like.id)? {
        return Err(ApiError::BadRequest(
            "The fields user, post must make a unique set.".to_string(),
        ));
    }
    LIKES.insert(store, &like)?;
    Ok(like)
}

pub fn like_post(store: &dyn KvStore, user_id: &str, post_id: &str) -> Result<Like, ApiError> {
    if post_id.is_empty() || POSTS.get(store, post_id)?.is_none() {
        return Err(ApiError::BadRequest("Post does not exist".to_string()));
    }
    if LIKES.find(store, |l| l.user == user_id && l.post == post_id)?.is_some() {
        return Err(ApiError::BadRequest("You have already liked this post.".to_string()));
    }

    let like = insert_like(store, user_id, post_id)?;
    tracing::info!("User {} liked post {}", user_id, post_id);
    Ok(like)
}

pub fn remove_like(store: &dyn KvStore, like: &Like) -> anyhow::Result<()> {
    release_unique(store, &like_index_key(&like.user, &like.post))?;
    LIKES.remove(store, &like.id)
}

// === HTTP Handlers ===

pub fn list_likes(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let likes = LIKES.filter(store, |l| l.user == user_id)?;

    json_response(200, &likes)
}

pub fn create_like(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let new_like: NewLike = parse_body(&req)?;
    let like = like_post(store, &user_id, new_like.post.trim())?;

    json_response(201, &like)
}

pub fn delete_like(store: &dyn KvStore, req: Request, like_id: &str) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;

    // Scoped to the requester's likes: someone else's like reads as absent
    let like = LIKES
        .get(store, like_id)?
        .filter(|l| l.user == user_id)
        .ok_or_else(|| ApiError::NotFound("Like not found".to_string()))?;
    remove_like(store, &like)?;

    Ok(no_content())
}
