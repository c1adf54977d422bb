// Photo sources: where raster bytes come from.

use async_trait::async_trait;
use pitchperfect_core::config::PhotoConfig;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("network unavailable: {0}")]
    NetworkUnavailable(#[from] reqwest::Error),

    #[error("photo server answered HTTP {status}")]
    HttpStatus { status: u16 },

    #[error("response is not an image (content type '{content_type}')")]
    NotAnImage { content_type: String },

    #[error("image is {width}x{height}, below the {min}px minimum")]
    TooSmall { width: u32, height: u32, min: u32 },

    #[error("photo fetching is disabled")]
    Disabled,
}

/// Raw bytes returned by a source, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait PhotoSource: Send + Sync {
    async fn fetch(&self, player: &str, team: &str) -> Result<Fetched, PhotoError>;
}

// ---------------------------------------------------------------------------
// Disabled source
// ---------------------------------------------------------------------------

/// Never fetches. Every lookup falls back to the avatar.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPhotoSource;

#[async_trait]
impl PhotoSource for NoPhotoSource {
    async fn fetch(&self, _player: &str, _team: &str) -> Result<Fetched, PhotoError> {
        Err(PhotoError::Disabled)
    }
}

// ---------------------------------------------------------------------------
// HTTP source
// ---------------------------------------------------------------------------

/// Fetches `url_template` with `{player}` and `{team}` substituted.
#[derive(Debug, Clone)]
pub struct HttpPhotoSource {
    http: reqwest::Client,
    url_template: String,
}

impl HttpPhotoSource {
    pub fn new(url_template: impl Into<String>, timeout: Duration, user_agent: &str) -> Result<Self, PhotoError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            http,
            url_template: url_template.into(),
        })
    }

    pub fn from_config(config: &PhotoConfig) -> Result<Self, PhotoError> {
        Self::new(
            config.url_template.clone(),
            Duration::from_secs(config.timeout_secs),
            &config.user_agent,
        )
    }

    pub fn url_for(&self, player: &str, team: &str) -> String {
        build_url(&self.url_template, player, team)
    }
}

#[async_trait]
impl PhotoSource for HttpPhotoSource {
    async fn fetch(&self, player: &str, team: &str) -> Result<Fetched, PhotoError> {
        if self.url_template.trim().is_empty() {
            return Err(PhotoError::Disabled);
        }
        let url = self.url_for(player, team);
        debug!("fetching photo from {}", url);

        let resp = self.http.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PhotoError::HttpStatus {
                status: status.as_u16(),
            });
        }
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let bytes = resp.bytes().await?.to_vec();
        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}

/// Substitute percent-encoded `player` and `team` into the template.
pub fn build_url(template: &str, player: &str, team: &str) -> String {
    template
        .replace("{player}", &encode_component(player))
        .replace("{team}", &encode_component(team))
}

fn encode_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => out.push(b as char),
            _ => out.push_str(&format!("%{b:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_placeholders_are_encoded() {
        let url = build_url(
            "https://img.example/{team}/{player}.png",
            "Kylian Mbappé",
            "Real Madrid",
        );
        assert_eq!(url, "https://img.example/Real%20Madrid/Kylian%20Mbapp%C3%A9.png");
    }

    #[tokio::test]
    async fn empty_template_is_disabled() {
        let source = HttpPhotoSource::from_config(&PhotoConfig::default()).unwrap();
        match source.fetch("Saka", "Arsenal").await {
            Err(PhotoError::Disabled) => {}
            other => panic!("expected Disabled, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn no_photo_source_is_disabled() {
        assert!(matches!(
            NoPhotoSource.fetch("Saka", "Arsenal").await,
            Err(PhotoError::Disabled)
        ));
    }
}
