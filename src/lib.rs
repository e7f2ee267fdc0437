//! Social media resource API: accounts, profiles, follows, posts, hashtags, likes
//! and comments over JSON/HTTP.
//!
//! Every host funnels requests through [`router::route`] with a [`core::store::KvStore`]:
//! the Spin component uses the default key/value store, the native binary an
//! in-memory one (see [`server`]).

pub mod auth;
pub mod comments;
pub mod config;
pub mod core;
pub mod follow;
pub mod hashtags;
pub mod likes;
pub mod models;
pub mod posts;
pub mod profiles;
pub mod router;
pub mod users;

#[cfg(not(target_arch = "wasm32"))]
pub mod server;

#[cfg(test)]
mod testing;

#[cfg(target_arch = "wasm32")]
use spin_sdk::{
    http::{IntoResponse, Request},
    http_component,
    key_value::Store,
};

// === Component entrypoint ===
#[cfg(target_arch = "wasm32")]
#[http_component]
fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
    let store = Store::open_default()?;
    Ok(router::route(&store, req))
}
