//! Artifact publisher: uploads the GIF to the object store and derives its
//! public URL and embed snippet.
//!
//! Object names are `<prefix><epoch-millis>.gif`. Every [`Publisher`] in a
//! process draws timestamps from one shared clock, so the process never
//! issues the same millisecond twice; two processes publishing in the same
//! millisecond can still collide.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{info, warn};
use reqwest::blocking::Client;

use crate::encode::AnimatedArtifact;
use crate::{Error, Result};

/// Default bucket used by the original deployment.
pub const DEFAULT_BUCKET: &str = "changong-images";

/// Default object-name prefix.
pub const DEFAULT_NAME_PREFIX: &str = "theblack_";

/// Object store settings. The credential is injected at startup.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Store base URL, e.g. `https://<project>.supabase.co`
    pub base_url: String,
    /// Static bearer credential
    pub api_key: String,
    pub bucket: String,
    pub name_prefix: String,
    /// Value of the `Cache-Control` header sent with uploads
    pub cache_control: String,
    pub timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: String::new(),
            bucket: DEFAULT_BUCKET.to_string(),
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            cache_control: "3600".to_string(),
            timeout_ms: 60_000,
        }
    }
}

impl StoreConfig {
    fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Endpoint the artifact is uploaded to.
    pub fn upload_url(&self, object_name: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base(), self.bucket, object_name)
    }

    /// Public retrieval URL; a pure function of base, bucket and name.
    pub fn public_url(&self, object_name: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.base(), self.bucket, object_name)
    }

    fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(Error::ConfigError("object store credential is empty".into()));
        }
        if self.bucket.trim().is_empty() {
            return Err(Error::ConfigError("bucket name is empty".into()));
        }
        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| Error::ConfigError(format!("invalid store URL `{}`: {}", self.base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::ConfigError(format!("store URL must be http(s): {}", self.base_url)));
        }
        Ok(())
    }
}

/// Terminal result handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedResult {
    pub file_name: String,
    /// Human-formatted size, e.g. `1.5 MB`
    pub file_size: String,
    pub byte_size: usize,
    #[serde(rename = "gifUrl")]
    pub public_url: String,
    pub html_code: String,
}

/// Issues `<prefix><millis>.gif` names with strictly increasing timestamps.
#[derive(Debug, Clone)]
pub struct NameGenerator {
    prefix: String,
    last_millis: Arc<AtomicU64>,
}

fn process_clock() -> Arc<AtomicU64> {
    static CLOCK: OnceLock<Arc<AtomicU64>> = OnceLock::new();
    CLOCK.get_or_init(|| Arc::new(AtomicU64::new(0))).clone()
}

impl NameGenerator {
    /// A generator with its own clock.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), last_millis: Arc::new(AtomicU64::new(0)) }
    }

    /// A generator sharing the clock of every other process-wide generator.
    pub fn process_wide(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), last_millis: process_clock() }
    }

    /// Name for the current time.
    pub fn next(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.next_at(now)
    }

    /// Name for `millis`, bumped past the last issued timestamp if needed.
    pub fn next_at(&self, millis: u64) -> String {
        let mut prev = self.last_millis.load(Ordering::SeqCst);
        loop {
            let candidate = millis.max(prev + 1);
            match self
                .last_millis
                .compare_exchange(prev, candidate, Ordering::SeqCst, Ordering::SeqCst)
            {
                Ok(_) => return object_name(&self.prefix, candidate),
                Err(actual) => prev = actual,
            }
        }
    }
}

pub fn object_name(prefix: &str, millis: u64) -> String {
    format!("{}{}.gif", prefix, millis)
}

/// Uploads artifacts with a single request each; never retries.
pub struct Publisher {
    client: Client,
    config: StoreConfig,
    names: NameGenerator,
}

impl Publisher {
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| Error::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        let names = NameGenerator::process_wide(config.name_prefix.clone());
        Ok(Self { client, config, names })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn publish(&self, artifact: &AnimatedArtifact) -> Result<PublishedResult> {
        let file_name = self.names.next();
        self.publish_as(artifact, &file_name)
    }

    /// Upload under an explicit object name.
    pub fn publish_as(&self, artifact: &AnimatedArtifact, file_name: &str) -> Result<PublishedResult> {
        let upload_url = self.config.upload_url(file_name);
        info!("Uploading {} ({} bytes)", file_name, artifact.size());

        let res = self
            .client
            .post(&upload_url)
            .bearer_auth(&self.config.api_key)
            .header(reqwest::header::CONTENT_TYPE, artifact.mime_type())
            .header(reqwest::header::CACHE_CONTROL, self.config.cache_control.as_str())
            .body(artifact.bytes().to_vec())
            .send()
            .map_err(|e| Error::UploadFailure(format!("request to object store failed: {}", e)))?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().unwrap_or_default();
            let detail = if body.trim().is_empty() { status.to_string() } else { body };
            warn!("Upload of {} rejected with {}", file_name, status);
            return Err(Error::UploadFailure(detail));
        }

        let public_url = self.config.public_url(file_name);
        info!("Published {}", public_url);

        Ok(PublishedResult {
            file_name: file_name.to_string(),
            file_size: format_file_size(artifact.size() as u64),
            byte_size: artifact.size(),
            html_code: embed_html(&public_url),
            public_url,
        })
    }

    /// Whether the store answers the bucket listing with the configured key.
    pub fn check_connection(&self) -> Result<bool> {
        let url = format!("{}/storage/v1/bucket", self.config.base());
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .map_err(|e| Error::UploadFailure(format!("object store unreachable: {}", e)))?;
        Ok(res.status().is_success())
    }
}

/// `<img>` snippet embedding the published GIF.
pub fn embed_html(url: &str) -> String {
    format!(
        r#"<img src="{}" alt="THE BLACK SHOP GIF" style="max-width: 100%; height: auto; border-radius: 8px;">"#,
        url
    )
}

/// Format a byte count in base-1024 units with up to two decimals.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = format!("{:.2}", value);
    let trimmed = rounded.trim_end_matches('0').trim_end_matches('.');
    format!("{} {}", trimmed, UNITS[unit])
}
