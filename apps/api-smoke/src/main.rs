use std::env;

use minichat_core::{ChatApi, UserId};
use minichat_http::HttpChatApi;
use url::Url;

#[tokio::main]
async fn main() {
    let base_url =
        env::var("MINICHAT_API_BASE_URL").unwrap_or_else(|_| "http://localhost:4001".to_owned());
    let acting_user_id: UserId = env::var("MINICHAT_SMOKE_USER_ID")
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
        .unwrap_or(1);

    let base_url = match Url::parse(&base_url) {
        Ok(url) => url,
        Err(err) => {
            eprintln!("Invalid MINICHAT_API_BASE_URL '{base_url}': {err}");
            std::process::exit(2);
        }
    };
    let api = match HttpChatApi::new(&base_url, None) {
        Ok(api) => api,
        Err(err) => {
            eprintln!("Failed to build HTTP client: {err}");
            std::process::exit(1);
        }
    };

    match api.fetch_current_user(acting_user_id).await {
        Ok(me) => println!("Connected to {} as {} (#{})", api.api_base(), me.name, me.id),
        Err(err) => {
            eprintln!("Smoke request failed: {err}");
            std::process::exit(1);
        }
    }

    match api.fetch_conversations(acting_user_id, 5, None).await {
        Ok(page) => println!(
            "First conversation page: {} item(s), has_more={}",
            page.items.len(),
            page.has_more
        ),
        Err(err) => {
            eprintln!("Conversation listing failed: {err}");
            std::process::exit(1);
        }
    }
}
