use std::sync::OnceLock;

use ammonia::Builder;
use html_escape::encode_double_quoted_attribute;
use regex::Regex;
use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::auth::require_user;
use crate::comments::{remove_comment, COMMENTS};
use crate::config::*;
use crate::core::collection::Collection;
use crate::core::errors::ApiError;
use crate::core::helpers::{deserialize_some, json_response, new_id, no_content, now, parse_body};
use crate::core::query_params::{get_string, parse_query_params};
use crate::core::store::KvStore;
use crate::follow::get_followings;
use crate::hashtags::{find_hashtag_by_name, normalize_hashtag_name, posts_for_hashtag, HASHTAGS};
use crate::likes::{remove_like, LIKES};
use crate::models::models::{Post, PostView};

/// Newest first, so index order is feed order.
pub static POSTS: Collection<Post> = Collection::newest_first("post", POSTS_LIST_KEY);

#[derive(Deserialize, Default)]
pub struct PostPayload {
    pub content: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub media: Option<Option<String>>,
    pub hashtags: Option<Vec<String>>,
}

fn url_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| {
        // Only bare URLs: ones inside an attribute or an existing anchor are preceded by `"` or `>`
        Regex::new(r"(^|[\s(])(https?://[^\s<]+)").expect("Regex should compile")
    })
}

fn filter_post_content(content: &str) -> String {
    // Sanitize HTML to remove dangerous scripts and event handlers
    let clean = Builder::default()
        .link_rel(Some("noopener noreferrer"))
        .clean(content)
        .to_string();

    // Convert HTTP/HTTPS URLs into clickable links with proper escaping
    url_regex()
        .replace_all(&clean, |caps: &regex::Captures| {
            let url = &caps[2];
            let escaped_url = encode_double_quoted_attribute(url);
            format!(r#"{}<a href="{}" target="_blank">{}</a>"#, &caps[1], escaped_url, url)
        })
        .to_string()
}

fn clean_content(content: Option<&str>) -> Result<String, ApiError> {
    let content = content.unwrap_or_default().trim();
    if content.is_empty() {
        return Err(ApiError::BadRequest("Content is required".to_string()));
    }
    if content.chars().count() > MAX_POST_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Content must be at most {} characters",
            MAX_POST_LENGTH
        )));
    }
    Ok(filter_post_content(content))
}

fn clean_media(media: Option<String>) -> Option<String> {
    media.map(|m| m.trim().to_string()).filter(|m| !m.is_empty())
}

/// Resolves hashtag names to ids. Every name must name an existing hashtag;
/// duplicates collapse.
fn resolve_hashtags(store: &dyn KvStore, names: &[String]) -> Result<Vec<String>, ApiError> {
    let names = names
        .iter()
        .map(|name| normalize_hashtag_name(name))
        .collect::<Result<Vec<_>, _>>()?;

    let mut ids = Vec::with_capacity(names.len());
    for name in &names {
        let hashtag = find_hashtag_by_name(store, name)?.ok_or_else(|| {
            ApiError::BadRequest(format!("Object with name={} does not exist.", name))
        })?;
        if !ids.contains(&hashtag.id) {
            ids.push(hashtag.id);
        }
    }
    Ok(ids)
}

pub fn to_view(store: &dyn KvStore, post: &Post) -> anyhow::Result<PostView> {
    let mut hashtags = Vec::with_capacity(post.hashtags.len());
    for id in &post.hashtags {
        if let Some(hashtag) = HASHTAGS.get(store, id)? {
            hashtags.push(hashtag.name);
        }
    }

    Ok(PostView {
        id: post.id.clone(),
        user: post.user.clone(),
        content: post.content.clone(),
        media: post.media.clone(),
        hashtags,
        created_at: post.created_at,
        updated_at: post.updated_at,
    })
}

fn to_views(store: &dyn KvStore, posts: &[Post]) -> anyhow::Result<Vec<PostView>> {
    posts.iter().map(|p| to_view(store, p)).collect()
}

pub fn create_post_record(store: &dyn KvStore, user_id: &str, payload: PostPayload) -> Result<Post, ApiError> {
    let content = clean_content(payload.content.as_deref())?;
    let hashtags = resolve_hashtags(store, payload.hashtags.as_deref().unwrap_or_default())?;

    let post = Post {
        id: new_id(),
        user: user_id.to_string(),
        content,
        media: clean_media(payload.media.flatten()),
        hashtags,
        created_at: now(),
        updated_at: None,
    };
    POSTS.insert(store, &post)?;

    tracing::info!("User {} created post {}", user_id, post.id);
    Ok(post)
}

fn update_post_record(
    store: &dyn KvStore,
    mut post: Post,
    payload: PostPayload,
    partial: bool,
) -> Result<Post, ApiError> {
    if !partial || payload.content.is_some() {
        post.content = clean_content(payload.content.as_deref())?;
    }
    match payload.media {
        Some(media) => post.media = clean_media(media),
        None if !partial => post.media = None,
        None => {}
    }
    match payload.hashtags {
        Some(names) => post.hashtags = resolve_hashtags(store, &names)?,
        None if !partial => post.hashtags.clear(),
        None => {}
    }

    post.updated_at = Some(now());
    POSTS.save(store, &post)?;
    Ok(post)
}

/// Deletes a post with its likes and comments.
pub fn remove_post(store: &dyn KvStore, post_id: &str) -> anyhow::Result<()> {
    for like in LIKES.filter(store, |l| l.post == post_id)? {
        remove_like(store, &like)?;
    }
    for comment in COMMENTS.filter(store, |c| c.post == post_id)? {
        remove_comment(store, &comment.id)?;
    }
    POSTS.remove(store, post_id)
}

/// Posts by users `user_id` follows, newest first.
pub fn feed_posts(store: &dyn KvStore, user_id: &str) -> anyhow::Result<Vec<Post>> {
    let followings = get_followings(store, user_id)?;
    POSTS.filter(store, |p| followings.contains(&p.user))
}

/// A post is visible to its owner and to the owner's followers. Anything else
/// reads as absent.
fn visible_post(store: &dyn KvStore, user_id: &str, post_id: &str) -> Result<Post, ApiError> {
    let not_found = || ApiError::NotFound("Post not found".to_string());
    let post = POSTS.get(store, post_id)?.ok_or_else(not_found)?;

    if post.user == user_id || get_followings(store, user_id)?.contains(&post.user) {
        Ok(post)
    } else {
        Err(not_found())
    }
}

fn owned_post(store: &dyn KvStore, user_id: &str, post_id: &str) -> Result<Post, ApiError> {
    let post = visible_post(store, user_id, post_id)?;
    if post.user != user_id {
        return Err(ApiError::Forbidden("You can only modify your own posts.".to_string()));
    }
    Ok(post)
}

// === HTTP Handlers ===

pub fn list_posts(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let posts = feed_posts(store, &user_id)?;

    json_response(200, &to_views(store, &posts)?)
}

pub fn create_post(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let payload: PostPayload = parse_body(&req)?;
    let post = create_post_record(store, &user_id, payload)?;

    json_response(201, &to_view(store, &post)?)
}

pub fn get_post(store: &dyn KvStore, req: Request, post_id: &str) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let post = visible_post(store, &user_id, post_id)?;

    json_response(200, &to_view(store, &post)?)
}

pub fn edit_post(store: &dyn KvStore, req: Request, post_id: &str, partial: bool) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let post = owned_post(store, &user_id, post_id)?;
    let payload: PostPayload = parse_body(&req)?;
    let post = update_post_record(store, post, payload, partial)?;

    json_response(200, &to_view(store, &post)?)
}

pub fn delete_post(store: &dyn KvStore, req: Request, post_id: &str) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let post = owned_post(store, &user_id, post_id)?;
    remove_post(store, &post.id)?;

    tracing::info!("User {} deleted post {}", user_id, post.id);
    Ok(no_content())
}

pub fn my_posts(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let posts = POSTS.filter(store, |p| p.user == user_id)?;

    json_response(200, &to_views(store, &posts)?)
}

pub fn hashtag_posts(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    require_user(store, &req)?;

    let params = parse_query_params(req.uri());
    let name = match get_string(&params, "hashtag") {
        Some(name) => name,
        None => return json_response(400, &serde_json::json!({"detail": "Hashtag not provided"})),
    };

    // Stored names never carry the leading `#`
    let name = name.strip_prefix('#').unwrap_or(&name);
    let posts = match find_hashtag_by_name(store, name)? {
        Some(hashtag) => posts_for_hashtag(store, &hashtag.id)?,
        None => Vec::new(),
    };

    json_response(200, &to_views(store, &posts)?)
}
