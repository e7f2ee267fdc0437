use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored entity addressable by its id.
pub trait Record {
    fn id(&self) -> &str;
}

macro_rules! record {
    ($($ty:ty),* $(,)?) => {
        $(impl Record for $ty {
            fn id(&self) -> &str {
                &self.id
            }
        })*
    };
}

record!(User, Profile, Follow, Hashtag, Post, Like, Comment);

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct User {
    pub id: String,
    pub email: String,
    pub password: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Profile {
    pub id: String,
    pub user: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Profile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Directed edge: `follower` subscribes to `following`.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Follow {
    pub id: String,
    pub follower: String,
    pub following: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Hashtag {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Post {
    pub id: String,
    pub user: String,
    pub content: String,
    pub media: Option<String>,
    /// Hashtag ids, in the order they were attached.
    pub hashtags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Like {
    pub id: String,
    pub user: String,
    pub post: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Comment {
    pub id: String,
    pub user: String,
    pub post: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, Deserialize)]
pub struct TokenData {
    pub user_id: String,
    pub created_at: DateTime<Utc>,
}

// === Response shapes ===

#[derive(Serialize, Debug, PartialEq)]
pub struct UserView {
    pub id: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

/// Summary shape returned by the profile listing.
#[derive(Serialize, Debug, PartialEq)]
pub struct ProfileSummary {
    pub id: String,
    pub username: String,
    pub full_name: String,
    pub profile_picture: Option<String>,
}

impl From<&Profile> for ProfileSummary {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            username: profile.username.clone(),
            full_name: profile.full_name(),
            profile_picture: profile.profile_picture.clone(),
        }
    }
}

#[derive(Serialize, Debug, PartialEq)]
pub struct ProfileDetail {
    pub id: String,
    pub user: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub bio: Option<String>,
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Profile> for ProfileDetail {
    fn from(profile: &Profile) -> Self {
        Self {
            id: profile.id.clone(),
            user: profile.user.clone(),
            username: profile.username.clone(),
            first_name: profile.first_name.clone(),
            last_name: profile.last_name.clone(),
            full_name: profile.full_name(),
            bio: profile.bio.clone(),
            profile_picture: profile.profile_picture.clone(),
            created_at: profile.created_at,
            updated_at: profile.updated_at,
        }
    }
}

/// Post as served over HTTP: hashtags are rendered by name.
#[derive(Serialize, Debug, PartialEq)]
pub struct PostView {
    pub id: String,
    pub user: String,
    pub content: String,
    pub media: Option<String>,
    pub hashtags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_first_and_last() {
        let profile = Profile {
            id: "p".into(),
            user: "u".into(),
            username: "test".into(),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            bio: None,
            profile_picture: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        assert_eq!(profile.full_name(), "Ada Lovelace");
        assert_eq!(ProfileSummary::from(&profile).full_name, "Ada Lovelace");
    }
}
