//! Request/response model seen by the offline worker.

use serde::{Deserialize, Serialize};

use crate::image::placeholder::OFFLINE_SVG;
use crate::utils::mime;

/// What the requester intends to do with the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    Image,
    Document,
    Other,
}

impl Destination {
    /// Parse a `Sec-Fetch-Dest` header value.
    pub fn from_fetch_dest(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Some(Self::Image),
            "document" | "iframe" | "frame" => Some(Self::Document),
            "" => None,
            _ => Some(Self::Other),
        }
    }

    /// Guess from the URL path when no header is available.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let mime = mime::from_path(std::path::Path::new(path));
        if mime::is_image(mime) {
            Self::Image
        } else if mime == mime::types::HTML || path.ends_with('/') || !has_extension(path) {
            Self::Document
        } else {
            Self::Other
        }
    }
}

fn has_extension(path: &str) -> bool {
    path.rsplit('/')
        .next()
        .and_then(|segment| segment.rfind('.'))
        .is_some_and(|dot| dot > 0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub url: String,
    pub destination: Destination,
}

impl Request {
    pub fn new(url: impl Into<String>, destination: Destination) -> Self {
        Self {
            url: url.into(),
            destination,
        }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::new(url, Destination::Image)
    }
}

/// Where a response came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    Cache,
    Network,
    Placeholder,
}

impl ResponseSource {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cache => "cache",
            Self::Network => "network",
            Self::Placeholder => "placeholder",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    pub source: ResponseSource,
}

impl Response {
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: vec![("Content-Type".to_string(), content_type.to_string())],
            body: body.into(),
            source: ResponseSource::Network,
        }
    }

    /// The "Image unavailable" SVG served when an image cannot be fetched.
    pub fn placeholder() -> Self {
        Self {
            source: ResponseSource::Placeholder,
            ..Self::new(200, mime::types::SVG, OFFLINE_SVG)
        }
    }

    pub fn not_found() -> Self {
        Self::new(404, mime::types::PLAIN, "404 Not Found")
    }

    /// 2xx status.
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
    }
}
