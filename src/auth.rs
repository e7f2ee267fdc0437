use serde::Deserialize;
use spin_sdk::http::{Request, Response};
use uuid::Uuid;

use crate::config::{token_expiration_hours, token_key, TOKENS_LIST_KEY};
use crate::core::errors::ApiError;
use crate::core::helpers::{bearer_token, json_response, now, parse_body, verify_password};
use crate::core::store::{JsonStore, KvStore};
use crate::models::models::TokenData;
use crate::users::{find_user_by_email, USERS};

#[derive(Deserialize)]
struct Credentials {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

pub fn issue_token(store: &dyn KvStore, user_id: &str) -> anyhow::Result<String> {
    let token = Uuid::new_v4().to_string();
    let data = TokenData {
        user_id: user_id.to_string(),
        created_at: now(),
    };
    store.set_json(&token_key(&token), &data)?;

    let mut tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.push(token.clone());
    store.set_json(TOKENS_LIST_KEY, &tokens)?;

    Ok(token)
}

pub fn revoke_token(store: &dyn KvStore, token: &str) -> anyhow::Result<()> {
    store.delete(&token_key(token))?;

    let mut tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    tokens.retain(|t| t != token);
    store.set_json(TOKENS_LIST_KEY, &tokens)
}

pub fn revoke_user_tokens(store: &dyn KvStore, user_id: &str) -> anyhow::Result<()> {
    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    let mut kept = Vec::with_capacity(tokens.len());

    for token in tokens {
        let key = token_key(&token);
        match store.get_json::<TokenData>(&key)? {
            Some(data) if data.user_id == user_id => store.delete(&key)?,
            Some(_) => kept.push(token),
            None => {}
        }
    }

    store.set_json(TOKENS_LIST_KEY, &kept)
}

pub fn login_user(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let creds: Credentials = parse_body(&req)?;

    let user = match find_user_by_email(store, &creds.email)? {
        Some(u) if verify_password(&creds.password, &u.password) => u,
        _ => {
            tracing::warn!("Rejected login for {}", creds.email);
            return Err(ApiError::Unauthorized);
        }
    };

    let token = issue_token(store, &user.id)?;
    tracing::info!("User {} logged in", user.id);

    json_response(
        200,
        &serde_json::json!({
            "token": token,
            "user_id": user.id
        }),
    )
}

pub fn logout_user(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    require_user(store, &req)?;
    let token = bearer_token(&req).ok_or(ApiError::Unauthorized)?;
    revoke_token(store, token)?;

    json_response(200, &serde_json::json!({"message": "Logged out successfully"}))
}

/// Resolves the bearer token to a live user id.
pub fn validate_token(store: &dyn KvStore, req: &Request) -> anyhow::Result<Option<String>> {
    let token = match bearer_token(req) {
        Some(t) => t,
        None => return Ok(None),
    };

    let data = match store.get_json::<TokenData>(&token_key(token))? {
        Some(d) => d,
        None => return Ok(None),
    };

    let age_hours = (now() - data.created_at).num_hours();
    if age_hours > token_expiration_hours() {
        return Ok(None);
    }

    // A deleted account invalidates its tokens
    if USERS.get(store, &data.user_id)?.is_none() {
        return Ok(None);
    }

    Ok(Some(data.user_id))
}

pub fn require_user(store: &dyn KvStore, req: &Request) -> Result<String, ApiError> {
    match validate_token(store, req)? {
        Some(user_id) => Ok(user_id),
        None => {
            tracing::warn!("Unauthenticated request to {}", req.path());
            Err(ApiError::Unauthorized)
        }
    }
}
