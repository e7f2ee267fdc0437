//! Load tests against a running server (`cargo run`, then `cargo test -- --ignored`).

use serde_json::{json, Value};
use std::time::Instant;

const NUM_USERS: usize = 50;
const POSTS_PER_USER: usize = 2;
const FEED_FETCHES: usize = 20;
const PASSWORD: &str = "perf-password";

fn base_url() -> String {
    std::env::var("SOCIAL_BASE_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string())
}

async fn signup(client: &reqwest::Client, base_url: &str, email: &str) -> Option<(String, String)> {
    let credentials = json!({"email": email, "password": PASSWORD});

    let resp = client.post(format!("{}/users", base_url)).json(&credentials).send().await.ok()?;
    if resp.status() != 201 {
        return None;
    }
    let user = resp.json::<Value>().await.ok()?;
    let user_id = user["id"].as_str()?.to_string();

    let resp = client.post(format!("{}/login", base_url)).json(&credentials).send().await.ok()?;
    if resp.status() != 200 {
        return None;
    }
    let token_data = resp.json::<Value>().await.ok()?;
    let token = token_data["token"].as_str()?.to_string();

    Some((user_id, token))
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn perf_test_users_with_posts() {
    let base_url = base_url();
    let client = reqwest::Client::new();
    let start = Instant::now();

    println!("\n=== Performance Test ===");
    println!("Creating {} users with {} posts each...", NUM_USERS, POSTS_PER_USER);

    let run_id = uuid::Uuid::new_v4().to_string()[0..8].to_string();
    let mut accounts = Vec::new();

    let user_creation_start = Instant::now();
    for i in 0..NUM_USERS {
        let email = format!("perf_{}_{}@perf.test", i, run_id);
        if let Some(account) = signup(&client, &base_url, &email).await {
            accounts.push(account);
        }

        if (i + 1) % 10 == 0 {
            println!("  Created {}/{} users", i + 1, NUM_USERS);
        }
    }
    let user_creation_time = user_creation_start.elapsed();

    println!(
        "User creation done: {} users in {:.2}s ({:.2} users/sec)",
        accounts.len(),
        user_creation_time.as_secs_f64(),
        accounts.len() as f64 / user_creation_time.as_secs_f64()
    );

    let post_creation_start = Instant::now();
    let mut posts_created = 0;
    let mut posts_failed = 0;

    for (idx, (_, token)) in accounts.iter().enumerate() {
        for post_num in 0..POSTS_PER_USER {
            let content = format!(
                "Post {} from user {} - Perf test at {}",
                post_num + 1,
                idx,
                chrono::Utc::now().to_rfc3339()
            );

            let post_resp = client
                .post(format!("{}/posts", base_url))
                .header("Authorization", format!("Bearer {}", token))
                .json(&json!({ "content": content }))
                .send()
                .await;

            match post_resp {
                Ok(resp) if resp.status() == 201 => posts_created += 1,
                _ => posts_failed += 1,
            }
        }
    }
    let post_creation_time = post_creation_start.elapsed();

    let total_time = start.elapsed();
    let total_requests = accounts.len() * 2 + posts_created + posts_failed;

    println!("\n=== Results ===");
    println!("Total time: {:.2}s", total_time.as_secs_f64());
    println!("User creation: {:.2}s", user_creation_time.as_secs_f64());
    println!("Post creation: {:.2}s", post_creation_time.as_secs_f64());
    println!("Users created: {}", accounts.len());
    println!("Posts created: {}", posts_created);
    println!("Posts failed: {}", posts_failed);
    println!("Total requests: {}", total_requests);
    println!(
        "Avg time per request: {:.2}ms",
        (total_time.as_secs_f64() * 1000.0) / total_requests as f64
    );
    println!(
        "Throughput: {:.0} requests/sec",
        total_requests as f64 / total_time.as_secs_f64()
    );
}

#[ignore]
#[tokio::test(flavor = "multi_thread")]
async fn perf_test_feed_of_follower() {
    let base_url = base_url();
    let client = reqwest::Client::new();
    let run_id = uuid::Uuid::new_v4().to_string()[0..8].to_string();

    println!("\n=== Feed Performance Test ===");

    let Some((_, reader_token)) = signup(&client, &base_url, &format!("reader_{}@perf.test", run_id)).await else {
        println!("Failed to create reader account");
        return;
    };

    let setup_start = Instant::now();
    let mut followed = 0;
    for i in 0..NUM_USERS {
        let Some((author_id, author_token)) =
            signup(&client, &base_url, &format!("author_{}_{}@perf.test", i, run_id)).await
        else {
            continue;
        };

        for post_num in 0..POSTS_PER_USER {
            let _ = client
                .post(format!("{}/posts", base_url))
                .header("Authorization", format!("Bearer {}", author_token))
                .json(&json!({ "content": format!("Author {} post {}", i, post_num) }))
                .send()
                .await;
        }

        let follow_resp = client
            .post(format!("{}/follow", base_url))
            .header("Authorization", format!("Bearer {}", reader_token))
            .json(&json!({ "following": author_id }))
            .send()
            .await;
        if matches!(follow_resp, Ok(ref resp) if resp.status() == 201) {
            followed += 1;
        }
    }
    println!("Setup: followed {} authors in {:.2}s", followed, setup_start.elapsed().as_secs_f64());

    let fetch_start = Instant::now();
    let mut feed_len = 0;
    for _ in 0..FEED_FETCHES {
        if let Ok(resp) = client
            .get(format!("{}/posts", base_url))
            .header("Authorization", format!("Bearer {}", reader_token))
            .send()
            .await
        {
            if let Ok(feed) = resp.json::<Value>().await {
                feed_len = feed.as_array().map(Vec::len).unwrap_or(0);
            }
        }
    }
    let fetch_time = fetch_start.elapsed();

    println!("\n=== Results ===");
    println!("Feed size: {}", feed_len);
    println!(
        "Avg feed fetch: {:.2}ms",
        (fetch_time.as_secs_f64() * 1000.0) / FEED_FETCHES as f64
    );
}
