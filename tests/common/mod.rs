#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mcp_trello::client::{RetryPolicy, Sleeper, TrelloClient};
use mcp_trello::config::TrelloConfig;
use serde_json::{json, Value};
use wiremock::MockServer;

pub const API_KEY: &str = "test_key";
pub const TOKEN: &str = "test_token";

/// Records requested waits instead of sleeping.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }

    pub fn total(&self) -> Duration {
        self.slept().into_iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

pub struct TestEnvironment {
    pub server: MockServer,
    pub sleeper: Arc<RecordingSleeper>,
    pub client: TrelloClient,
}

impl TestEnvironment {
    pub async fn new() -> Self {
        Self::with_policy(RetryPolicy::default()).await
    }

    pub async fn with_policy(policy: RetryPolicy) -> Self {
        let server = MockServer::start().await;
        let sleeper = Arc::new(RecordingSleeper::default());
        let config = TrelloConfig::new(API_KEY, TOKEN)
            .with_base_url(server.uri())
            .with_timeout(Duration::from_secs(5))
            .with_retry(policy);
        let client = TrelloClient::with_sleeper(config, sleeper.clone())
            .expect("Failed to create test client");

        Self {
            server,
            sleeper,
            client,
        }
    }
}

pub fn card_json(id: &str, name: &str, list_id: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "desc": "",
        "url": format!("https://trello.com/c/{}", id),
        "idBoard": "B1",
        "idList": list_id
    })
}

pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("mcp_trello=debug")
        .with_test_writer()
        .try_init();
}
