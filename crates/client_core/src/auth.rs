use async_trait::async_trait;

/// External auth collaborator. The realtime core reads the current bearer
/// token once at connect time; refreshing and validating it is someone
/// else's job.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    async fn access_token(&self) -> Option<String>;
}

/// Fixed-token provider for wiring the core into a host that already holds
/// a session token.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl AccessTokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Option<String> {
        Some(self.token.clone())
    }
}

pub struct MissingTokenProvider;

#[async_trait]
impl AccessTokenProvider for MissingTokenProvider {
    async fn access_token(&self) -> Option<String> {
        None
    }
}
