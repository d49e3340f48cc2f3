//! YouTube Data API existence check.

use super::{MetadataVerifier, Verification};
use crate::error::{Result, VidbriefError};
use crate::video::VideoId;
use async_trait::async_trait;
use tracing::{debug, instrument};

const DATA_API_URL: &str = "https://www.googleapis.com/youtube/v3/videos";

/// Verifier backed by the YouTube Data API v3 `videos.list` call.
pub struct DataApiVerifier {
    client: reqwest::Client,
    api_key: String,
}

impl DataApiVerifier {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl MetadataVerifier for DataApiVerifier {
    #[instrument(skip(self), fields(video_id = %id))]
    async fn verify(&self, id: &VideoId) -> Result<Verification> {
        let response = self
            .client
            .get(DATA_API_URL)
            .query(&[("part", "id"), ("id", id.as_str()), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!("Data API returned {}", status);

        interpret_response(status, &body)
    }
}

/// Map a `videos.list` response onto a verification outcome.
fn interpret_response(status: u16, body: &str) -> Result<Verification> {
    if status == 403 && body.contains("quotaExceeded") {
        return Ok(Verification::QuotaExceeded);
    }
    if !(200..300).contains(&status) {
        return Err(VidbriefError::Verification(format!(
            "Data API returned {}: {}",
            status, body
        )));
    }

    let json: serde_json::Value = serde_json::from_str(body)?;
    let found = json["items"].as_array().is_some_and(|items| !items.is_empty());

    Ok(if found {
        Verification::Exists
    } else {
        Verification::NotFound
    })
}
