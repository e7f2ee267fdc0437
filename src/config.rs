pub fn token_expiration_hours() -> i64 {
    std::env::var("SOCIAL_TOKEN_EXPIRATION_HOURS")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .unwrap_or(24)
}

pub fn bind_addr() -> String {
    std::env::var("SOCIAL_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string())
}

pub fn seed_demo_data_enabled() -> bool {
    std::env::var("SOCIAL_SEED_DEMO_DATA")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

// === Validation limits ===
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_USERNAME_LENGTH: usize = 100;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_BIO_LENGTH: usize = 500;
pub const MAX_POST_LENGTH: usize = 5000;
pub const MAX_COMMENT_LENGTH: usize = 2000;
pub const MAX_HASHTAG_LENGTH: usize = 100;

// === KV index keys ===
pub const USERS_LIST_KEY: &str = "users_list";
pub const PROFILES_LIST_KEY: &str = "profiles_list";
pub const FOLLOWS_LIST_KEY: &str = "follows_list";
pub const HASHTAGS_LIST_KEY: &str = "hashtags_list";
pub const POSTS_LIST_KEY: &str = "posts_list";
pub const LIKES_LIST_KEY: &str = "likes_list";
pub const COMMENTS_LIST_KEY: &str = "comments_list";
pub const TOKENS_LIST_KEY: &str = "tokens_list";

pub fn token_key(token: &str) -> String {
    format!("token:{}", token)
}

/// Unique index entry for a user's email.
pub fn email_index_key(email: &str) -> String {
    format!("user_email:{}", email.to_lowercase())
}

pub fn username_index_key(username: &str) -> String {
    format!("profile_username:{}", username)
}

pub fn profile_owner_index_key(user_id: &str) -> String {
    format!("profile_user:{}", user_id)
}

pub fn hashtag_name_index_key(name: &str) -> String {
    format!("hashtag_name:{}", name)
}

pub fn like_index_key(user_id: &str, post_id: &str) -> String {
    format!("like_pair:{}:{}", user_id, post_id)
}
