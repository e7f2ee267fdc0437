use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::auth::{require_user, revoke_user_tokens};
use crate::comments::{remove_comment, COMMENTS};
use crate::config::*;
use crate::core::collection::{claim_unique, release_unique, unique_owner, Collection};
use crate::core::errors::ApiError;
use crate::core::helpers::{hash_password, json_response, new_id, no_content, now, parse_body};
use crate::core::store::KvStore;
use crate::follow::FOLLOWS;
use crate::likes::{remove_like, LIKES};
use crate::models::models::{User, UserView};
use crate::posts::{remove_post, POSTS};
use crate::profiles::{profile_of, remove_profile};

pub static USERS: Collection<User> = Collection::new("user", USERS_LIST_KEY);

#[derive(Deserialize)]
struct NewUser {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

fn email_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Regex should compile"))
}

/// Lowercases the domain part, leaving the local part as given.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{}@{}", local, domain.to_lowercase()),
        None => email.to_string(),
    }
}

pub fn find_user_by_email(store: &dyn KvStore, email: &str) -> anyhow::Result<Option<User>> {
    let email = normalize_email(email);
    match unique_owner(store, &email_index_key(&email))? {
        Some(user_id) => USERS.get(store, &user_id),
        None => Ok(None),
    }
}

/// Validates and stores a new account.
pub fn register(store: &dyn KvStore, email: &str, password: &str) -> Result<User, ApiError> {
    let email = normalize_email(email);

    if email.is_empty() {
        return Err(ApiError::BadRequest("Email is required".to_string()));
    }
    if email.len() > MAX_EMAIL_LENGTH || !email_regex().is_match(&email) {
        return Err(ApiError::BadRequest("Enter a valid email address".to_string()));
    }
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LENGTH
        )));
    }

    let id = new_id();
    if !claim_unique(store, &email_index_key(&email), &id)? {
        return Err(ApiError::BadRequest(
            "User with this email already exists".to_string(),
        ));
    }

    let user = User {
        id,
        email,
        password: hash_password(password)?,
        created_at: now(),
    };
    USERS.insert(store, &user)?;

    tracing::info!("Registered user {}", user.id);
    Ok(user)
}

/// Removes a user and everything hanging off it.
pub fn delete_user(store: &dyn KvStore, user_id: &str) -> anyhow::Result<()> {
    let user = match USERS.get(store, user_id)? {
        Some(u) => u,
        None => return Ok(()),
    };

    remove_profile(store, user_id)?;

    for post in POSTS.filter(store, |p| p.user == user_id)? {
        remove_post(store, &post.id)?;
    }
    for follow in FOLLOWS.filter(store, |f| f.follower == user_id || f.following == user_id)? {
        FOLLOWS.remove(store, &follow.id)?;
    }
    for like in LIKES.filter(store, |l| l.user == user_id)? {
        remove_like(store, &like)?;
    }
    for comment in COMMENTS.filter(store, |c| c.user == user_id)? {
        remove_comment(store, &comment.id)?;
    }

    revoke_user_tokens(store, user_id)?;
    release_unique(store, &email_index_key(&user.email))?;
    USERS.remove(store, user_id)?;

    tracing::info!("Deleted user {} with all dependent records", user_id);
    Ok(())
}

// === HTTP Handlers ===

pub fn create_user(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let new_user: NewUser = parse_body(&req)?;
    let user = register(store, &new_user.email, &new_user.password)?;

    json_response(201, &UserView::from(&user))
}

pub fn get_me(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let user = USERS
        .get(store, &user_id)?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    let profile = profile_of(store, &user_id)?;

    json_response(
        200,
        &serde_json::json!({
            "id": user.id,
            "email": user.email,
            "created_at": user.created_at,
            "profile": profile.map(|p| p.id),
        }),
    )
}

pub fn delete_me(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    delete_user(store, &user_id)?;

    Ok(no_content())
}
