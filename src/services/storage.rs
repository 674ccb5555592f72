use anyhow::Context;
use async_trait::async_trait;

/// Logical destinations for uploaded images.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bucket {
    Images,
    Profiles,
    Logos,
}

impl Bucket {
    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::Images => "images",
            Bucket::Profiles => "profiles",
            Bucket::Logos => "logos",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "images" => Some(Bucket::Images),
            "profiles" => Some(Bucket::Profiles),
            "logos" => Some(Bucket::Logos),
            _ => None,
        }
    }
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store an image and return a publicly resolvable URL.
    async fn upload(
        &self,
        bucket: Bucket,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> anyhow::Result<String>;
}

/// Object storage over HTTP (Supabase-storage shaped endpoints).
pub struct HttpImageStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpImageStore {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(
        &self,
        bucket: Bucket,
        filename: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> anyhow::Result<String> {
        let url = format!("{}/object/{}/{}", self.base_url, bucket.as_str(), filename);

        self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", content_type.to_string())
            .body(bytes)
            .send()
            .await
            .context("failed to reach image storage")?
            .error_for_status()
            .context("image storage returned error")?;

        Ok(format!(
            "{}/object/public/{}/{}",
            self.base_url,
            bucket.as_str(),
            filename
        ))
    }
}
