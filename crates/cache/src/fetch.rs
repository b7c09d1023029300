use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Fixed bound for a single raw-content download.
pub const RAW_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// Downloads file content that the API did not return inline.
#[async_trait]
pub trait RawFetcher: Send + Sync {
    async fn fetch_raw(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError>;
}

pub struct HttpRawFetcher {
    client: Client,
}

impl HttpRawFetcher {
    pub fn new() -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(RAW_FETCH_TIMEOUT)
            .user_agent(concat!("gixt/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RawFetcher for HttpRawFetcher {
    async fn fetch_raw(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        if url.trim().is_empty() {
            return Err("file has no raw URL".into());
        }
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }
}
