use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::auth::require_user;
use crate::config::*;
use crate::core::collection::{claim_unique, release_unique, unique_owner, Collection};
use crate::core::errors::ApiError;
use crate::core::helpers::{json_response, new_id, no_content, now, parse_body};
use crate::core::store::KvStore;
use crate::models::models::{Hashtag, Post};
use crate::posts::POSTS;

pub static HASHTAGS: Collection<Hashtag> = Collection::new("hashtag", HASHTAGS_LIST_KEY);

#[derive(Deserialize)]
struct HashtagPayload {
    name: Option<String>,
}

/// Trims the name and drops one leading `#`.
pub fn normalize_hashtag_name(raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    let name = name.strip_prefix('#').unwrap_or(name);

    if name.is_empty() {
        return Err(ApiError::BadRequest("Hashtag name is required".to_string()));
    }
    if name.chars().any(char::is_whitespace) {
        return Err(ApiError::BadRequest(
            "Hashtag name must not contain whitespace".to_string(),
        ));
    }
    if name.chars().count() > MAX_HASHTAG_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Hashtag name must be at most {} characters",
            MAX_HASHTAG_LENGTH
        )));
    }
    Ok(name.to_string())
}

pub fn find_hashtag_by_name(store: &dyn KvStore, name: &str) -> anyhow::Result<Option<Hashtag>> {
    match unique_owner(store, &hashtag_name_index_key(name))? {
        Some(id) => HASHTAGS.get(store, &id),
        None => Ok(None),
    }
}

pub fn create_hashtag(store: &dyn KvStore, raw_name: &str) -> Result<Hashtag, ApiError> {
    let name = normalize_hashtag_name(raw_name)?;
    let hashtag = Hashtag {
        id: new_id(),
        name,
        created_at: now(),
    };

    if !claim_unique(store, &hashtag_name_index_key(&hashtag.name), &hashtag.id)? {
        return Err(ApiError::BadRequest(
            "Hashtag with this name already exists".to_string(),
        ));
    }
    HASHTAGS.insert(store, &hashtag)?;

    tracing::info!("Created hashtag #{}", hashtag.name);
    Ok(hashtag)
}

pub fn get_or_create_hashtag(store: &dyn KvStore, raw_name: &str) -> Result<Hashtag, ApiError> {
    let name = normalize_hashtag_name(raw_name)?;
    match find_hashtag_by_name(store, &name)? {
        Some(existing) => Ok(existing),
        None => create_hashtag(store, &name),
    }
}

/// Posts tagged with `hashtag_id`, newest first.
pub fn posts_for_hashtag(store: &dyn KvStore, hashtag_id: &str) -> anyhow::Result<Vec<Post>> {
    POSTS.filter(store, |p| p.hashtags.iter().any(|h| h == hashtag_id))
}

fn rename_hashtag(store: &dyn KvStore, mut hashtag: Hashtag, raw_name: &str) -> Result<Hashtag, ApiError> {
    let name = normalize_hashtag_name(raw_name)?;
    if name == hashtag.name {
        return Ok(hashtag);
    }

    if !claim_unique(store, &hashtag_name_index_key(&name), &hashtag.id)? {
        return Err(ApiError::BadRequest(
            "Hashtag with this name already exists".to_string(),
        ));
    }
    release_unique(store, &hashtag_name_index_key(&hashtag.name))?;

    hashtag.name = name;
    HASHTAGS.save(store, &hashtag)?;
    Ok(hashtag)
}

/// Deletes the hashtag and detaches it from every post.
pub fn remove_hashtag(store: &dyn KvStore, hashtag: &Hashtag) -> anyhow::Result<()> {
    for mut post in posts_for_hashtag(store, &hashtag.id)? {
        post.hashtags.retain(|h| h != &hashtag.id);
        POSTS.save(store, &post)?;
    }

    release_unique(store, &hashtag_name_index_key(&hashtag.name))?;
    HASHTAGS.remove(store, &hashtag.id)
}

fn load_hashtag(store: &dyn KvStore, hashtag_id: &str) -> Result<Hashtag, ApiError> {
    HASHTAGS
        .get(store, hashtag_id)?
        .ok_or_else(|| ApiError::NotFound("Hashtag not found".to_string()))
}

// === HTTP Handlers ===

pub fn list_hashtags(store: &dyn KvStore, _req: Request) -> Result<Response, ApiError> {
    json_response(200, &HASHTAGS.all(store)?)
}

pub fn get_hashtag(store: &dyn KvStore, _req: Request, hashtag_id: &str) -> Result<Response, ApiError> {
    json_response(200, &load_hashtag(store, hashtag_id)?)
}

pub fn handle_create_hashtag(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    require_user(store, &req)?;
    let payload: HashtagPayload = parse_body(&req)?;
    let hashtag = create_hashtag(store, payload.name.as_deref().unwrap_or_default())?;

    json_response(201, &hashtag)
}

pub fn update_hashtag(
    store: &dyn KvStore,
    req: Request,
    hashtag_id: &str,
    partial: bool,
) -> Result<Response, ApiError> {
    require_user(store, &req)?;
    let hashtag = load_hashtag(store, hashtag_id)?;
    let payload: HashtagPayload = parse_body(&req)?;

    let hashtag = match payload.name {
        Some(name) => rename_hashtag(store, hashtag, &name)?,
        None if partial => hashtag,
        None => return Err(ApiError::BadRequest("Hashtag name is required".to_string())),
    };

    json_response(200, &hashtag)
}

pub fn delete_hashtag(store: &dyn KvStore, req: Request, hashtag_id: &str) -> Result<Response, ApiError> {
    require_user(store, &req)?;
    let hashtag = load_hashtag(store, hashtag_id)?;
    remove_hashtag(store, &hashtag)?;

    tracing::info!("Deleted hashtag #{}", hashtag.name);
    Ok(no_content())
}
