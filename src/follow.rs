use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::auth::require_user;
use crate::config::*;
use crate::core::collection::Collection;
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, new_id, no_content, now, parse_body, validate_uuid};
use crate::core::store::KvStore;
use crate::models::models::{Follow, User};
use crate::users::USERS;

pub static FOLLOWS: Collection<Follow> = Collection::new("follow", FOLLOWS_LIST_KEY);

#[derive(Deserialize)]
struct NewFollow {
    #[serde(default)]
    following: String,
}

/// Stores a follow edge. Self-follows are rejected here, at the storage boundary;
/// duplicate edges are not.
pub fn insert_follow(store: &dyn KvStore, follower_id: &str, following_id: &str) -> Result<Follow, ApiError> {
    if follower_id == following_id {
        return Err(ApiError::BadRequest("Users cannot follow themselves.".to_string()));
    }

    let follow = Follow {
        id: new_id(),
        follower: follower_id.to_string(),
        following: following_id.to_string(),
        created_at: now(),
    };
    FOLLOWS.insert(store, &follow)?;
    Ok(follow)
}

pub fn follow_user(store: &dyn KvStore, follower_id: &str, following_id: &str) -> Result<Follow, ApiError> {
    if following_id.is_empty() {
        return Err(ApiError::BadRequest("Target user is required".to_string()));
    }
    if !validate_uuid(following_id) {
        return Err(ApiError::BadRequest("Invalid user id".to_string()));
    }
    if USERS.get(store, following_id)?.is_none() {
        return Err(ApiError::BadRequest("Target user does not exist".to_string()));
    }
    if !get_follow_edges(store, follower_id, following_id)?.is_empty() {
        return Err(ApiError::BadRequest(
            "You are already subscribed to this user.".to_string(),
        ));
    }

    let follow = insert_follow(store, follower_id, following_id)?;
    tracing::info!("User {} followed {}", follower_id, following_id);
    Ok(follow)
}

fn get_follow_edges(store: &dyn KvStore, follower_id: &str, following_id: &str) -> anyhow::Result<Vec<Follow>> {
    FOLLOWS.filter(store, |f| f.follower == follower_id && f.following == following_id)
}

/// Removes every edge from `follower_id` to `following_id`. Returns false when
/// there was none.
pub fn unfollow_user(store: &dyn KvStore, follower_id: &str, following_id: &str) -> anyhow::Result<bool> {
    let edges = get_follow_edges(store, follower_id, following_id)?;
    for edge in &edges {
        FOLLOWS.remove(store, &edge.id)?;
    }
    Ok(!edges.is_empty())
}

/// Ids of users `user_id` follows, deduplicated, in follow order.
pub fn get_followings(store: &dyn KvStore, user_id: &str) -> anyhow::Result<Vec<String>> {
    let mut followings = Vec::new();
    for edge in FOLLOWS.filter(store, |f| f.follower == user_id)? {
        if !followings.contains(&edge.following) {
            followings.push(edge.following);
        }
    }
    Ok(followings)
}

/// Ids of users following `user_id`, deduplicated, in follow order.
pub fn get_followers(store: &dyn KvStore, user_id: &str) -> anyhow::Result<Vec<String>> {
    let mut followers = Vec::new();
    for edge in FOLLOWS.filter(store, |f| f.following == user_id)? {
        if !followers.contains(&edge.follower) {
            followers.push(edge.follower);
        }
    }
    Ok(followers)
}

fn emails(store: &dyn KvStore, user_ids: &[String]) -> anyhow::Result<Vec<String>> {
    let mut emails = Vec::with_capacity(user_ids.len());
    for id in user_ids {
        if let Some(User { email, .. }) = USERS.get(store, id)? {
            emails.push(email);
        }
    }
    Ok(emails)
}

// === HTTP Handlers ===

pub fn list_follows(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let follows = FOLLOWS.filter(store, |f| f.follower == user_id)?;

    json_response(200, &follows)
}

pub fn handle_follow(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let new_follow: NewFollow = parse_body(&req)?;
    let follow = follow_user(store, &user_id, new_follow.following.trim())?;

    json_response(201, &follow)
}

/// `target_user_id` names the followed user, not the edge.
pub fn handle_unfollow(store: &dyn KvStore, req: Request, target_user_id: &str) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;

    if !unfollow_user(store, &user_id, target_user_id)? {
        return Err(ApiError::NotFound("Follow not found".to_string()));
    }

    tracing::info!("User {} unfollowed {}", user_id, target_user_id);
    Ok(no_content())
}

pub fn get_followings_list(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let followings = emails(store, &get_followings(store, &user_id)?)?;

    json_response(200, &serde_json::json!({"following": followings}))
}

pub fn get_followers_list(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let followers = emails(store, &get_followers(store, &user_id)?)?;

    json_response(200, &serde_json::json!({"followers": followers}))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::MemoryStore;
    use crate::testing::{call, register_and_login};
    use serde_json::json;
    use spin_sdk::http::Method;

    #[test]
    fn self_follow_is_rejected_at_storage_level() {
        let store = MemoryStore::new();
        let (ann, _) = register_and_login(&store, "ann@example.com");

        let err = insert_follow(&store, &ann, &ann).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(FOLLOWS.all(&store).unwrap().is_empty());
    }

    #[test]
    fn storage_allows_duplicate_edges_but_api_does_not() {
        let store = MemoryStore::new();
        let (ann, ann_token) = register_and_login(&store, "ann@example.com");
        let (bob, _) = register_and_login(&store, "bob@example.com");

        insert_follow(&store, &ann, &bob).unwrap();
        insert_follow(&store, &ann, &bob).unwrap();
        assert_eq!(FOLLOWS.all(&store).unwrap().len(), 2);
        assert_eq!(get_followings(&store, &ann).unwrap(), vec![bob.clone()]);

        let (status, _) = call(&store, Method::Post, "/follow", Some(&ann_token), Some(json!({"following": bob})));
        assert_eq!(status, 400);
    }

    #[test]
    fn follow_via_api() {
        let store = MemoryStore::new();
        let (ann, ann_token) = register_and_login(&store, "ann@example.com");
        let (bob, _) = register_and_login(&store, "bob@example.com");

        let (status, body) = call(&store, Method::Post, "/follow", Some(&ann_token), Some(json!({"following": bob})));
        assert_eq!(status, 201);
        assert_eq!(body["follower"], ann);
        assert_eq!(body["following"], bob);

        let (status, body) = call(&store, Method::Get, "/follow", Some(&ann_token), None);
        assert_eq!(status, 200);
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (status, _) = call(&store, Method::Post, "/follow", Some(&ann_token), Some(json!({"following": ann})));
        assert_eq!(status, 400);
        let (status, _) = call(&store, Method::Post, "/follow", Some(&ann_token), Some(json!({"following": "ghost"})));
        assert_eq!(status, 400);
    }

    #[test]
    fn following_and_followers_lists_report_emails() {
        let store = MemoryStore::new();
        let (_, ann_token) = register_and_login(&store, "ann@example.com");
        let (bob, bob_token) = register_and_login(&store, "bob@example.com");

        call(&store, Method::Post, "/follow", Some(&ann_token), Some(json!({"following": bob})));

        let (status, body) = call(&store, Method::Get, "/follow/following", Some(&ann_token), None);
        assert_eq!(status, 200);
        assert_eq!(body, json!({"following": ["bob@example.com"]}));

        let (status, body) = call(&store, Method::Get, "/follow/followers", Some(&bob_token), None);
        assert_eq!(status, 200);
        assert_eq!(body, json!({"followers": ["ann@example.com"]}));

        let (_, body) = call(&store, Method::Get, "/follow/followers", Some(&ann_token), None);
        assert_eq!(body, json!({"followers": []}));
    }

    #[test]
    fn unfollow_by_target_user_id() {
        let store = MemoryStore::new();
        let (_, ann_token) = register_and_login(&store, "ann@example.com");
        let (bob, bob_token) = register_and_login(&store, "bob@example.com");
        let (_, edge) = call(&store, Method::Post, "/follow", Some(&ann_token), Some(json!({"following": bob})));

        // The edge id is not an accepted identifier
        let edge_url = format!("/follow/{}", edge["id"].as_str().unwrap());
        let (status, _) = call(&store, Method::Delete, &edge_url, Some(&ann_token), None);
        assert_eq!(status, 404);

        // Someone else's follows are invisible
        let url = format!("/follow/{}", bob);
        let (status, _) = call(&store, Method::Delete, &url, Some(&bob_token), None);
        assert_eq!(status, 404);

        let (status, _) = call(&store, Method::Delete, &url, Some(&ann_token), None);
        assert_eq!(status, 204);
        assert!(FOLLOWS.all(&store).unwrap().is_empty());
    }
}
