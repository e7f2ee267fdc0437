use crate::auth::revoke_token;
use crate::comments::{add_comment, COMMENTS};
use crate::config::*;
use crate::core::collection::release_unique;
use crate::core::errors::ApiError;
use crate::core::store::{JsonStore, KvStore};
use crate::follow::{follow_user, get_followings, FOLLOWS};
use crate::hashtags::{get_or_create_hashtag, HASHTAGS};
use crate::likes::LIKES;
use crate::models::models::User;
use crate::posts::{create_post_record, PostPayload, POSTS};
use crate::profiles::{create_profile, ProfilePayload, PROFILES};
use crate::users::{find_user_by_email, register, USERS};

struct DemoUser {
    email: &'static str,
    password: &'static str,
    username: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    bio: &'static str,
    posts: &'static [&'static str],
}

const DEMO_USERS: &[DemoUser] = &[
    DemoUser {
        email: "test@example.com",
        password: "test-password",
        username: "test",
        first_name: "Test",
        last_name: "User",
        bio: "Test user bio",
        posts: &["This is my first post!"],
    },
    DemoUser {
        email: "alice@example.com",
        password: "alice-password",
        username: "alice",
        first_name: "Alice",
        last_name: "Liddell",
        bio: "Hello, I'm Alice!",
        posts: &[
            "Welcome to my page! Excited to share thoughts here.",
            "Just finished an amazing project. Feeling productive today!",
        ],
    },
    DemoUser {
        email: "bob@example.com",
        password: "bob-password",
        username: "bob",
        first_name: "Bob",
        last_name: "Builder",
        bio: "Bob's corner of the internet",
        posts: &["Hey everyone! Just joined, looking forward to connecting with you all."],
    },
];

fn seed_user(store: &dyn KvStore, demo: &DemoUser) -> Result<User, ApiError> {
    if let Some(existing) = find_user_by_email(store, demo.email)? {
        return Ok(existing);
    }

    let user = register(store, demo.email, demo.password)?;
    create_profile(
        store,
        &user.id,
        ProfilePayload {
            username: Some(demo.username.to_string()),
            first_name: Some(demo.first_name.to_string()),
            last_name: Some(demo.last_name.to_string()),
            bio: Some(Some(demo.bio.to_string())),
            profile_picture: None,
        },
    )?;

    for content in demo.posts {
        create_post_record(
            store,
            &user.id,
            PostPayload {
                content: Some(content.to_string()),
                media: None,
                hashtags: Some(vec!["welcome".to_string()]),
            },
        )?;
    }

    Ok(user)
}

/// Creates the demo accounts, profiles and posts. Safe to run repeatedly.
pub fn seed_demo_data(store: &dyn KvStore) -> Result<(), ApiError> {
    get_or_create_hashtag(store, "welcome")?;

    let mut seeded = Vec::with_capacity(DEMO_USERS.len());
    for demo in DEMO_USERS {
        seeded.push(seed_user(store, demo)?);
    }

    // "test" follows "bob" and says hello under bob's first post
    let (test, bob) = (&seeded[0], &seeded[2]);
    if !get_followings(store, &test.id)?.contains(&bob.id) {
        follow_user(store, &test.id, &bob.id)?;

        if let Some(post) = POSTS.find(store, |p| p.user == bob.id)? {
            add_comment(store, &test.id, &post.id, Some("Welcome aboard, Bob!"))?;
        }
    }

    tracing::info!("Demo data ready ({} users)", USERS.ids(store)?.len());
    Ok(())
}

/// Deletes every record, unique index and token.
pub fn reset_db_data(store: &dyn KvStore) -> anyhow::Result<()> {
    for user in USERS.all(store)? {
        release_unique(store, &email_index_key(&user.email))?;
        release_unique(store, &profile_owner_index_key(&user.id))?;
    }
    for profile in PROFILES.all(store)? {
        release_unique(store, &username_index_key(&profile.username))?;
    }
    for hashtag in HASHTAGS.all(store)? {
        release_unique(store, &hashtag_name_index_key(&hashtag.name))?;
    }
    for like in LIKES.all(store)? {
        release_unique(store, &like_index_key(&like.user, &like.post))?;
    }

    COMMENTS.clear(store)?;
    LIKES.clear(store)?;
    POSTS.clear(store)?;
    HASHTAGS.clear(store)?;
    FOLLOWS.clear(store)?;
    PROFILES.clear(store)?;
    USERS.clear(store)?;

    let tokens: Vec<String> = store.get_json(TOKENS_LIST_KEY)?.unwrap_or_default();
    for token in tokens {
        revoke_token(store, &token)?;
    }
    store.delete(TOKENS_LIST_KEY)?;

    Ok(())
}
