//! Common test utilities for E2E tests

use std::sync::{Arc, Mutex};

use authdesk::error::AppError;
use authdesk::storage::MediaHost;
use authdesk::{AppState, config};
use axum::async_trait;
use serde_json::json;
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const MEDIA_PUBLIC_URL: &str = "https://media.test.example.com";

/// One upload seen by [`RecordingMediaHost`]
#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub key: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// In-memory media host that records uploads instead of calling R2
#[derive(Default)]
pub struct RecordingMediaHost {
    uploads: Mutex<Vec<RecordedUpload>>,
}

impl RecordingMediaHost {
    pub fn uploads(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl MediaHost for RecordingMediaHost {
    async fn upload(
        &self,
        key: &str,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<String, AppError> {
        self.uploads.lock().unwrap().push(RecordedUpload {
            key: key.to_string(),
            content_type: content_type.to_string(),
            data,
        });
        Ok(format!("{}/{}", MEDIA_PUBLIC_URL, key))
    }
}

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub media: Arc<RecordingMediaHost>,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// Create test configuration rooted in `temp_dir`
pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "localhost".to_string(),
            protocol: "http".to_string(),
            cors_origins: Vec::new(),
            max_body_bytes: 1024 * 1024,
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
        },
        storage: config::StorageConfig {
            media: config::MediaStorageConfig {
                bucket: "test-media".to_string(),
                public_url: MEDIA_PUBLIC_URL.to_string(),
                max_avatar_bytes: 64 * 1024,
            },
        },
        cloudflare: config::CloudflareConfig {
            account_id: "test-account".to_string(),
            r2_access_key_id: "test-key".to_string(),
            r2_secret_access_key: "test-secret".to_string(),
        },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 604800,
            cookie_name: "jwt".to_string(),
            bcrypt_cost: 4,
        },
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        Self::with_config(test_config(&temp_dir), temp_dir).await
    }

    /// Create a test server from an explicit configuration
    pub async fn with_config(config: config::AppConfig, temp_dir: TempDir) -> Self {
        let media = Arc::new(RecordingMediaHost::default());
        let state = AppState::with_media_host(config, media.clone())
            .await
            .unwrap();

        // Cookie store so a signup/login session carries over
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let addr_str = format!("http://{}", addr);

        let app = authdesk::build_router(state.clone());

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: addr_str,
            state,
            media,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// A client with its own, empty cookie store
    pub fn fresh_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap()
    }

    /// Sign up through the API with `client`, asserting success
    pub async fn signup_with(
        &self,
        client: &reqwest::Client,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> serde_json::Value {
        let response = client
            .post(self.url("/signup"))
            .json(&json!({
                "fullName": full_name,
                "email": email,
                "password": password,
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        response.json().await.unwrap()
    }

    /// Sign up through the shared client
    pub async fn signup(&self, full_name: &str, email: &str, password: &str) -> serde_json::Value {
        self.signup_with(&self.client, full_name, email, password)
            .await
    }

    /// Create a signed session token for `user_id`
    pub fn create_test_token(&self, user_id: &str) -> String {
        use authdesk::auth::{Session, create_session_token};

        let session = Session::new(user_id, 3600);
        create_session_token(&session, &self.state.config.auth.session_secret)
            .expect("Failed to create test token")
    }
}

/// All `Set-Cookie` header values of a response
pub fn set_cookie_headers(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect()
}

/// The `Set-Cookie` header for the session cookie, if any
pub fn session_set_cookie(response: &reqwest::Response) -> Option<String> {
    set_cookie_headers(response)
        .into_iter()
        .find(|value| value.starts_with("jwt="))
}
