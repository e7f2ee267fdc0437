use spin_sdk::http::{Request, Response};

use crate::core::errors::ApiError;
use crate::core::store::KvStore;
use crate::{auth, comments, follow, hashtags, likes, posts, profiles, users};

/// Dispatches one request. Errors are rendered into the response, never returned.
pub fn route(store: &dyn KvStore, req: Request) -> Response {
    let method = req.method().to_string();
    let path = req.path().to_string();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    tracing::debug!("{} {}", method, path);

    match dispatch(store, &method, &segments, req) {
        Ok(resp) => resp,
        Err(err) => {
            tracing::debug!("{} {} failed: {}", method, path, err);
            err.into()
        }
    }
}

fn dispatch(store: &dyn KvStore, method: &str, segments: &[&str], req: Request) -> Result<Response, ApiError> {
    match (method, segments) {
        ("POST", ["users"]) => users::create_user(store, req),
        ("GET", ["users", "me"]) => users::get_me(store, req),
        ("DELETE", ["users", "me"]) => users::delete_me(store, req),
        ("POST", ["login"]) => auth::login_user(store, req),
        ("POST", ["logout"]) => auth::logout_user(store, req),

        ("GET", ["profiles"]) => profiles::list_profiles(store, req),
        ("POST", ["profiles"]) => profiles::handle_create_profile(store, req),
        ("GET", ["profiles", id]) => profiles::get_profile(store, req, id),
        ("PUT", ["profiles", id]) => profiles::update_profile(store, req, id, false),
        ("PATCH", ["profiles", id]) => profiles::update_profile(store, req, id, true),
        ("DELETE", ["profiles", id]) => profiles::delete_profile(store, req, id),

        ("GET", ["follow"]) => follow::list_follows(store, req),
        ("POST", ["follow"]) => follow::handle_follow(store, req),
        ("GET", ["follow", "following"]) => follow::get_followings_list(store, req),
        ("GET", ["follow", "followers"]) => follow::get_followers_list(store, req),
        ("DELETE", ["follow", user_id]) => follow::handle_unfollow(store, req, user_id),

        ("GET", ["posts"]) => posts::list_posts(store, req),
        ("POST", ["posts"]) => posts::create_post(store, req),
        ("GET", ["posts", "my-posts"]) => posts::my_posts(store, req),
        ("GET", ["posts", "hashtag-posts"]) => posts::hashtag_posts(store, req),
        ("GET", ["posts", id]) => posts::get_post(store, req, id),
        ("PUT", ["posts", id]) => posts::edit_post(store, req, id, false),
        ("PATCH", ["posts", id]) => posts::edit_post(store, req, id, true),
        ("DELETE", ["posts", id]) => posts::delete_post(store, req, id),

        ("GET", ["posts", post_id, "comments"]) => comments::list_comments(store, req, post_id),
        ("POST", ["posts", post_id, "comments"]) => comments::create_comment(store, req, post_id),
        ("GET", ["posts", post_id, "comments", id]) => comments::get_comment(store, req, post_id, id),
        ("PUT", ["posts", post_id, "comments", id]) => comments::update_comment(store, req, post_id, id, false),
        ("PATCH", ["posts", post_id, "comments", id]) => comments::update_comment(store, req, post_id, id, true),
        ("DELETE", ["posts", post_id, "comments", id]) => comments::delete_comment(store, req, post_id, id),

        ("GET", ["hashtags"]) => hashtags::list_hashtags(store, req),
        ("POST", ["hashtags"]) => hashtags::handle_create_hashtag(store, req),
        ("GET", ["hashtags", id]) => hashtags::get_hashtag(store, req, id),
        ("PUT", ["hashtags", id]) => hashtags::update_hashtag(store, req, id, false),
        ("PATCH", ["hashtags", id]) => hashtags::update_hashtag(store, req, id, true),
        ("DELETE", ["hashtags", id]) => hashtags::delete_hashtag(store, req, id),

        ("GET", ["likes"]) => likes::list_likes(store, req),
        ("POST", ["likes"]) => likes::create_like(store, req),
        ("DELETE", ["likes", id]) => likes::delete_like(store, req, id),

        (_, segments) if is_resource_path(segments) => Err(ApiError::MethodNotAllowed),
        _ => Err(ApiError::NotFound("No route found".to_string())),
    }
}

fn is_resource_path(segments: &[&str]) -> bool {
    matches!(
        segments,
        ["users"]
            | ["users", "me"]
            | ["login"]
            | ["logout"]
            | ["profiles"]
            | ["profiles", _]
            | ["follow"]
            | ["follow", _]
            | ["posts"]
            | ["posts", _]
            | ["posts", _, "comments"]
            | ["posts", _, "comments", _]
            | ["hashtags"]
            | ["hashtags", _]
            | ["likes"]
            | ["likes", _]
    )
}
