//! YouTube caption fetcher.
//!
//! Retrieves captions through the InnerTube player endpoint and the timedtext
//! XML track it points to.

use super::{Segment, TranscriptFetcher};
use crate::error::{Result, VidbriefError};
use crate::video::VideoId;
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, instrument};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const INNERTUBE_CLIENT_VERSION: &str = "2.20241126.01.00";

#[derive(Debug, Deserialize)]
struct PlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
}

/// Caption fetcher backed by YouTube's public endpoints.
pub struct YoutubeCaptionFetcher {
    client: reqwest::Client,
    languages: Vec<String>,
}

impl YoutubeCaptionFetcher {
    /// Create a fetcher that prefers the given caption languages, in order.
    pub fn new(client: reqwest::Client, languages: Vec<String>) -> Self {
        Self { client, languages }
    }

    async fn fetch_player(&self, id: &VideoId) -> Result<PlayerResponse> {
        let watch_url = id.watch_url();
        debug!("Fetching watch page: {}", watch_url);

        let page_html = self
            .client
            .get(&watch_url)
            .header("User-Agent", USER_AGENT)
            .header("Accept-Language", "en-US")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        if page_html.contains("class=\"g-recaptcha\"") {
            return Err(VidbriefError::Transcript(
                "Too many requests: YouTube is asking for a captcha".to_string(),
            ));
        }

        let api_key = extract_api_key(&page_html)?;

        let player_url = format!(
            "https://www.youtube.com/youtubei/v1/player?key={}&prettyPrint=false",
            api_key
        );
        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": self.languages.first().map(String::as_str).unwrap_or("en"),
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": id.as_str(),
        });

        let player = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(player)
    }

    /// Pick the first preferred language that has a track, else the first track.
    fn select_track<'a>(&self, tracks: &'a [CaptionTrack]) -> Option<&'a CaptionTrack> {
        self.languages
            .iter()
            .find_map(|lang| tracks.iter().find(|t| &t.language_code == lang))
            .or_else(|| tracks.first())
    }
}

#[async_trait]
impl TranscriptFetcher for YoutubeCaptionFetcher {
    #[instrument(skip(self), fields(video_id = %id))]
    async fn fetch(&self, id: &VideoId) -> Result<Vec<Segment>> {
        let player = self.fetch_player(id).await?;

        if let Some(status) = &player.playability_status {
            check_playability(id, status)?;
        }

        let tracks = player
            .captions
            .and_then(|c| c.player_captions_tracklist_renderer)
            .and_then(|r| r.caption_tracks)
            .unwrap_or_default();

        let track = self.select_track(&tracks).ok_or_else(|| {
            VidbriefError::Transcript(format!("Transcripts are disabled for video {}", id))
        })?;
        debug!("Using caption track: lang={}", track.language_code);

        let caption_xml = self
            .client
            .get(&track.base_url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_caption_xml(&caption_xml)
    }
}

fn check_playability(id: &VideoId, status: &PlayabilityStatus) -> Result<()> {
    let reason = status.reason.as_deref().unwrap_or("no reason given");
    match status.status.as_str() {
        "OK" => Ok(()),
        "ERROR" if reason.to_lowercase().contains("unavailable") => Err(
            VidbriefError::Transcript(format!("Video {} not found", id)),
        ),
        _ => Err(VidbriefError::Transcript(format!(
            "Video {} is unavailable: {}",
            id, reason
        ))),
    }
}

fn extract_api_key(html: &str) -> Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)
        .map_err(|e| VidbriefError::Transcript(e.to_string()))?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    let re = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)
        .map_err(|e| VidbriefError::Transcript(e.to_string()))?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    Err(VidbriefError::Transcript(
        "could not extract InnerTube API key from watch page".to_string(),
    ))
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>> {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current: Option<(f64, f64)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    let value = String::from_utf8_lossy(&attr.value);
                    match attr.key.as_ref() {
                        b"start" => start = value.parse::<f64>().ok(),
                        b"dur" => dur = value.parse::<f64>().ok(),
                        _ => {}
                    }
                }
                current = Some((start.unwrap_or_default(), dur.unwrap_or_default()));
            }
            Ok(Event::Text(ref e)) => {
                if let Some((start, duration)) = current.take() {
                    let raw_text = e.unescape().unwrap_or_default().to_string();
                    let text = html_escape::decode_html_entities(&raw_text).trim().to_string();
                    if !text.is_empty() {
                        segments.push(Segment {
                            text,
                            start,
                            duration,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(VidbriefError::Transcript(format!(
                    "error parsing caption XML: {}",
                    e
                )))
            }
            _ => {}
        }
    }

    Ok(segments)
}
