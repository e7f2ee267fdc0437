use serde::Deserialize;
use spin_sdk::http::{Request, Response};

use crate::auth::require_user;
use crate::config::*;
use crate::core::collection::{claim_unique, release_unique, unique_owner, Collection};
use crate::core::errors::ApiError;
use crate::core::helpers::{
    deserialize_some, json_response, new_id, no_content, now, parse_body,
};
use crate::core::query_params::{get_string, parse_query_params};
use crate::core::store::KvStore;
use crate::models::models::{Profile, ProfileDetail, ProfileSummary};

pub static PROFILES: Collection<Profile> = Collection::new("profile", PROFILES_LIST_KEY);

#[derive(Deserialize, Default)]
pub struct ProfilePayload {
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub bio: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub profile_picture: Option<Option<String>>,
}

fn required_text(value: Option<&str>, field: &str, max: usize) -> Result<String, ApiError> {
    let text = value.unwrap_or_default().trim().to_string();
    if text.is_empty() {
        return Err(ApiError::BadRequest(format!("{} is required", field)));
    }
    if text.chars().count() > max {
        return Err(ApiError::BadRequest(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(text)
}

fn clean_bio(bio: Option<String>) -> Result<Option<String>, ApiError> {
    let bio = match bio {
        Some(b) => b,
        None => return Ok(None),
    };
    if bio.chars().count() > MAX_BIO_LENGTH {
        return Err(ApiError::BadRequest(format!(
            "Bio too long (max {} chars)",
            MAX_BIO_LENGTH
        )));
    }
    let bio = bio.trim();
    Ok(if bio.is_empty() { None } else { Some(bio.to_string()) })
}

fn clean_reference(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Applies `payload` onto `profile`. With `partial == false` every required field
/// must be present and absent optional fields are cleared.
fn apply_payload(profile: &mut Profile, payload: ProfilePayload, partial: bool) -> Result<(), ApiError> {
    if !partial || payload.username.is_some() {
        profile.username = required_text(payload.username.as_deref(), "Username", MAX_USERNAME_LENGTH)?;
    }
    if !partial || payload.first_name.is_some() {
        profile.first_name = required_text(payload.first_name.as_deref(), "First name", MAX_NAME_LENGTH)?;
    }
    if !partial || payload.last_name.is_some() {
        profile.last_name = required_text(payload.last_name.as_deref(), "Last name", MAX_NAME_LENGTH)?;
    }
    match payload.bio {
        Some(bio) => profile.bio = clean_bio(bio)?,
        None if !partial => profile.bio = None,
        None => {}
    }
    match payload.profile_picture {
        Some(picture) => profile.profile_picture = clean_reference(picture),
        None if !partial => profile.profile_picture = None,
        None => {}
    }
    Ok(())
}

pub fn profile_of(store: &dyn KvStore, user_id: &str) -> anyhow::Result<Option<Profile>> {
    match unique_owner(store, &profile_owner_index_key(user_id))? {
        Some(profile_id) => PROFILES.get(store, &profile_id),
        None => Ok(None),
    }
}

/// Creates the profile of `user_id`. Each user has at most one, and usernames are unique.
pub fn create_profile(
    store: &dyn KvStore,
    user_id: &str,
    payload: ProfilePayload,
) -> Result<Profile, ApiError> {
    if profile_of(store, user_id)?.is_some() {
        return Err(ApiError::BadRequest(
            "Profile already exists for this user".to_string(),
        ));
    }

    let mut profile = Profile {
        id: new_id(),
        user: user_id.to_string(),
        username: String::new(),
        first_name: String::new(),
        last_name: String::new(),
        bio: None,
        profile_picture: None,
        created_at: now(),
        updated_at: None,
    };
    apply_payload(&mut profile, payload, false)?;

    if !claim_unique(store, &username_index_key(&profile.username), &profile.id)? {
        return Err(ApiError::BadRequest(
            "Profile with this username already exists".to_string(),
        ));
    }
    if !claim_unique(store, &profile_owner_index_key(user_id), &profile.id)? {
        release_unique(store, &username_index_key(&profile.username))?;
        return Err(ApiError::BadRequest(
            "Profile already exists for this user".to_string(),
        ));
    }
    PROFILES.insert(store, &profile)?;

    tracing::info!("Created profile {} for user {}", profile.username, user_id);
    Ok(profile)
}

pub fn update_profile_record(
    store: &dyn KvStore,
    mut profile: Profile,
    payload: ProfilePayload,
    partial: bool,
) -> Result<Profile, ApiError> {
    let old_username = profile.username.clone();
    apply_payload(&mut profile, payload, partial)?;

    if profile.username != old_username {
        if !claim_unique(store, &username_index_key(&profile.username), &profile.id)? {
            return Err(ApiError::BadRequest(
                "Profile with this username already exists".to_string(),
            ));
        }
        release_unique(store, &username_index_key(&old_username))?;
    }

    profile.updated_at = Some(now());
    PROFILES.save(store, &profile)?;
    Ok(profile)
}

fn delete_profile_record(store: &dyn KvStore, profile: &Profile) -> anyhow::Result<()> {
    release_unique(store, &username_index_key(&profile.username))?;
    release_unique(store, &profile_owner_index_key(&profile.user))?;
    PROFILES.remove(store, &profile.id)
}

/// Deletes the profile owned by `user_id`, if any.
pub fn remove_profile(store: &dyn KvStore, user_id: &str) -> anyhow::Result<()> {
    if let Some(profile) = profile_of(store, user_id)? {
        delete_profile_record(store, &profile)?;
    }
    Ok(())
}

/// Case-insensitive substring match on the username.
pub fn search_profiles(store: &dyn KvStore, username: Option<&str>) -> anyhow::Result<Vec<Profile>> {
    match username {
        Some(needle) => {
            let needle = needle.to_lowercase();
            PROFILES.filter(store, |p| p.username.to_lowercase().contains(&needle))
        }
        None => PROFILES.all(store),
    }
}

fn owned_profile(store: &dyn KvStore, user_id: &str, profile_id: &str) -> Result<Profile, ApiError> {
    let profile = PROFILES
        .get(store, profile_id)?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    if profile.user != user_id {
        return Err(ApiError::Forbidden("You can only edit your profile.".to_string()));
    }
    Ok(profile)
}

// === HTTP Handlers ===

pub fn list_profiles(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    require_user(store, &req)?;

    let params = parse_query_params(req.uri());
    let username = get_string(&params, "username");
    let profiles: Vec<ProfileSummary> = search_profiles(store, username.as_deref())?
        .iter()
        .map(ProfileSummary::from)
        .collect();

    json_response(200, &profiles)
}

pub fn get_profile(store: &dyn KvStore, req: Request, profile_id: &str) -> Result<Response, ApiError> {
    require_user(store, &req)?;

    let profile = PROFILES
        .get(store, profile_id)?
        .ok_or_else(|| ApiError::NotFound("Profile not found".to_string()))?;

    json_response(200, &ProfileDetail::from(&profile))
}

pub fn handle_create_profile(store: &dyn KvStore, req: Request) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let payload: ProfilePayload = parse_body(&req)?;
    let profile = create_profile(store, &user_id, payload)?;

    json_response(201, &ProfileDetail::from(&profile))
}

pub fn update_profile(
    store: &dyn KvStore,
    req: Request,
    profile_id: &str,
    partial: bool,
) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let profile = owned_profile(store, &user_id, profile_id)?;
    let payload: ProfilePayload = parse_body(&req)?;
    let profile = update_profile_record(store, profile, payload, partial)?;

    json_response(200, &ProfileDetail::from(&profile))
}

pub fn delete_profile(store: &dyn KvStore, req: Request, profile_id: &str) -> Result<Response, ApiError> {
    let user_id = require_user(store, &req)?;
    let profile = owned_profile(store, &user_id, profile_id)?;
    delete_profile_record(store, &profile)?;

    tracing::info!("Deleted profile {}", profile.id);
    Ok(no_content())
}
