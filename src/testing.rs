//! Request helpers for the unit tests: drive the router the way a host would.

use serde_json::{json, Value};
use spin_sdk::http::{Method, Request};

use crate::core::store::KvStore;
use crate::router::route;

pub const TEST_PASSWORD: &str = "long-enough";

pub fn call_raw(
    store: &dyn KvStore,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Vec<u8>,
) -> (u16, Value) {
    let mut builder = Request::builder();
    builder.method(method).uri(uri);
    if let Some(token) = token {
        builder.header("Authorization", format!("Bearer {}", token));
    }
    if !body.is_empty() {
        builder.header("Content-Type", "application/json");
    }
    let req = builder.body(body).build();

    let resp = route(store, req);
    let status = *resp.status();
    let body = if resp.body().is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(resp.body()).expect("response body is JSON")
    };
    (status, body)
}

pub fn call(
    store: &dyn KvStore,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (u16, Value) {
    let bytes = body
        .map(|b| serde_json::to_vec(&b).expect("serializable body"))
        .unwrap_or_default();
    call_raw(store, method, uri, token, bytes)
}

/// Registers `email` and returns `(user_id, token)`.
pub fn register_and_login(store: &dyn KvStore, email: &str) -> (String, String) {
    let credentials = json!({"email": email, "password": TEST_PASSWORD});

    let (status, user) = call(store, Method::Post, "/users", None, Some(credentials.clone()));
    assert_eq!(status, 201, "register failed: {}", user);

    let (status, login) = call(store, Method::Post, "/login", None, Some(credentials));
    assert_eq!(status, 200, "login failed: {}", login);

    (
        user["id"].as_str().expect("user id").to_string(),
        login["token"].as_str().expect("token").to_string(),
    )
}
