//! Data feed: how traffic snapshots get into the engine.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::StatusCode;

use fluxmap_graph::TrafficSnapshot;

/// Connectivity as the dashboard reports it; a failed poll flips to
/// `Disconnected` until a fetch succeeds again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStatus {
    Connected,
    Disconnected,
}

impl Default for ServerStatus {
    fn default() -> Self {
        ServerStatus::Disconnected
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerStatus::Connected => write!(f, "connected"),
            ServerStatus::Disconnected => write!(f, "disconnected"),
        }
    }
}

/// A source of traffic snapshots. The poll loop only sees this trait,
/// so tests feed it canned snapshots instead of a live backend.
pub trait TrafficFeed {
    fn fetch(&self, offset_secs: u64) -> Result<TrafficSnapshot, FeedError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    BuildClient { message: String },
    Http { message: String },
    HttpStatus { code: u16 },
    DecodeResponse { message: String },
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::BuildClient { message } => write!(f, "client build failed: {message}"),
            FeedError::Http { message } => write!(f, "http request failed: {message}"),
            FeedError::HttpStatus { code } => write!(f, "http status {code}"),
            FeedError::DecodeResponse { message } => {
                write!(f, "decode response failed: {message}")
            }
        }
    }
}

impl Error for FeedError {}

/// HTTP polling client for the backend's snapshot endpoint. The replay
/// offset travels as the `offset` query parameter in whole seconds.
#[derive(Debug, Clone)]
pub struct HttpTrafficFeed {
    url: String,
    client: Client,
}

impl HttpTrafficFeed {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, FeedError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| FeedError::BuildClient {
                message: err.to_string(),
            })?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TrafficFeed for HttpTrafficFeed {
    fn fetch(&self, offset_secs: u64) -> Result<TrafficSnapshot, FeedError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("offset", offset_secs.to_string())])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .map_err(|err| FeedError::Http {
                message: err.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FeedError::HttpStatus {
                code: status.as_u16(),
            });
        }

        response.json().map_err(|err| FeedError::DecodeResponse {
            message: err.to_string(),
        })
    }
}
