//! Daily image archive client.
//!
//! Fetches the list of recent wallpapers from the Bing image archive
//! (`HPImageArchive.aspx`). Nothing here holds state between calls.

use crate::config::MAX_CANDIDATES;
use crate::error::ChangeError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One daily wallpaper option
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Absolute image URL
    pub url: String,
    pub title: String,
    pub copyright: String,
    /// Archive date, `YYYYMMDD`
    pub start_date: String,
}

/// Source of wallpaper candidates
pub trait WallpaperFeed: Send + Sync {
    /// Return up to `count` candidates, newest first
    fn fetch(&self, count: usize) -> Result<Vec<Candidate>, ChangeError>;

    /// Small preview image bytes for a candidate
    fn thumbnail(&self, candidate: &Candidate) -> Result<Vec<u8>, ChangeError> {
        Err(ChangeError::DownloadFailed(format!(
            "no thumbnail available for {}",
            candidate.url
        )))
    }
}

/// Thumbnail URL for an archive image.
///
/// Bing's `/th?id=` endpoint resizes on request; other URLs are used as-is.
pub fn thumbnail_url(url: &str) -> String {
    if url.contains("/th?id=") && !url.contains("&w=") {
        format!("{}&w=384&h=216", url)
    } else {
        url.to_string()
    }
}

#[derive(Deserialize)]
struct Archive {
    #[serde(default)]
    images: Vec<ArchiveImage>,
}

#[derive(Deserialize)]
struct ArchiveImage {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    copyright: String,
    #[serde(default)]
    startdate: String,
}

/// Shared blocking HTTP client for the feed and the downloader
pub fn http_client() -> Result<reqwest::blocking::Client, ChangeError> {
    reqwest::blocking::Client::builder()
        .user_agent(concat!("BingWallpaper/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(15))
        .timeout(Duration::from_secs(60))
        .build()
        .map_err(|e| ChangeError::FeedUnavailable(format!("failed to build HTTP client: {}", e)))
}

/// Parse an archive response body into at most `count` candidates.
///
/// Relative image URLs are joined onto `base_url`.
pub fn parse_archive(body: &str, base_url: &str, count: usize) -> Result<Vec<Candidate>, ChangeError> {
    let archive: Archive = serde_json::from_str(body)
        .map_err(|e| ChangeError::FeedUnavailable(format!("malformed archive response: {}", e)))?;

    let base = base_url.trim_end_matches('/');

    Ok(archive
        .images
        .into_iter()
        .filter(|image| !image.url.is_empty())
        .take(count)
        .map(|image| Candidate {
            url: if image.url.starts_with("http://") || image.url.starts_with("https://") {
                image.url
            } else if image.url.starts_with('/') {
                format!("{}{}", base, image.url)
            } else {
                format!("{}/{}", base, image.url)
            },
            title: image.title,
            copyright: image.copyright,
            start_date: image.startdate,
        })
        .collect())
}

/// Feed backed by the Bing image archive
pub struct BingFeed {
    client: reqwest::blocking::Client,
    base_url: String,
    market: Option<String>,
}

impl BingFeed {
    pub fn new(
        client: reqwest::blocking::Client,
        base_url: impl Into<String>,
        market: Option<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            market,
        }
    }

    fn archive_url(&self, count: usize) -> String {
        let mut url = format!(
            "{}/HPImageArchive.aspx?format=js&idx=0&n={}",
            self.base_url.trim_end_matches('/'),
            count
        );
        if let Some(market) = self.market.as_deref().filter(|m| !m.is_empty()) {
            url.push_str("&mkt=");
            url.push_str(market);
        }
        url
    }
}

impl WallpaperFeed for BingFeed {
    fn fetch(&self, count: usize) -> Result<Vec<Candidate>, ChangeError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let count = count.min(MAX_CANDIDATES);
        let url = self.archive_url(count);
        tracing::debug!(url = %url, "Fetching image archive");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ChangeError::FeedUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChangeError::FeedUnavailable(format!("HTTP {}", status)));
        }

        let body = response
            .text()
            .map_err(|e| ChangeError::FeedUnavailable(e.to_string()))?;

        let candidates = parse_archive(&body, &self.base_url, count)?;
        tracing::debug!("Image archive returned {} candidates", candidates.len());
        Ok(candidates)
    }

    fn thumbnail(&self, candidate: &Candidate) -> Result<Vec<u8>, ChangeError> {
        let url = thumbnail_url(&candidate.url);
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| ChangeError::DownloadFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChangeError::DownloadFailed(format!("HTTP {} for {}", status, url)));
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|e| ChangeError::DownloadFailed(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::{local_client, TestServer};

    const BODY: &str = r#"{
        "images": [
            {"startdate": "20240102", "url": "/th?id=OHR.First_1920x1080.jpg", "title": "First", "copyright": "A (C)"},
            {"startdate": "20240101", "url": "https://cdn.example.com/second.jpg", "title": "Second", "copyright": "B (C)"},
            {"startdate": "20231231", "url": "/th?id=OHR.Third_1920x1080.jpg"}
        ],
        "tooltips": {}
    }"#;

    #[test]
    fn test_parse_archive_joins_relative_urls() {
        let candidates = parse_archive(BODY, "https://www.bing.com/", 8).unwrap();
        assert_eq!(candidates.len(), 3);
        assert_eq!(
            candidates[0].url,
            "https://www.bing.com/th?id=OHR.First_1920x1080.jpg"
        );
        assert_eq!(candidates[0].title, "First");
        assert_eq!(candidates[0].start_date, "20240102");
        assert_eq!(candidates[1].url, "https://cdn.example.com/second.jpg");
        assert_eq!(candidates[2].title, "");
    }

    #[test]
    fn test_parse_archive_truncates() {
        let candidates = parse_archive(BODY, "https://www.bing.com", 1).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "First");
    }

    #[test]
    fn test_parse_archive_empty_and_malformed() {
        assert!(parse_archive(r#"{"images": []}"#, "https://www.bing.com", 8)
            .unwrap()
            .is_empty());
        assert!(parse_archive("{}", "https://www.bing.com", 8).unwrap().is_empty());

        let err = parse_archive("<html>", "https://www.bing.com", 8).unwrap_err();
        assert!(matches!(err, ChangeError::FeedUnavailable(_)));
    }

    #[test]
    fn test_archive_url_includes_market() {
        let client = reqwest::blocking::Client::new();
        let feed = BingFeed::new(client.clone(), "https://www.bing.com/", None);
        assert_eq!(
            feed.archive_url(8),
            "https://www.bing.com/HPImageArchive.aspx?format=js&idx=0&n=8"
        );

        let feed = BingFeed::new(client, "https://www.bing.com", Some("en-GB".to_string()));
        assert!(feed.archive_url(3).ends_with("&n=3&mkt=en-GB"));
    }

    #[test]
    fn test_fetch_zero_returns_nothing() {
        let server = TestServer::serve(vec![(200, BODY.as_bytes().to_vec())]);
        let feed = BingFeed::new(local_client(), server.base_url.clone(), None);

        assert!(feed.fetch(0).unwrap().is_empty());
        assert!(server.requests().is_empty());
    }

    #[test]
    fn test_fetch_caps_count_and_joins_urls() {
        let server = TestServer::serve(vec![(200, BODY.as_bytes().to_vec())]);
        let feed = BingFeed::new(local_client(), server.base_url.clone(), None);

        let candidates = feed.fetch(2).unwrap();
        assert_eq!(candidates.len(), 2);
        assert_eq!(
            candidates[0].url,
            format!("{}/th?id=OHR.First_1920x1080.jpg", server.base_url)
        );
        assert_eq!(
            server.requests(),
            vec!["GET /HPImageArchive.aspx?format=js&idx=0&n=2 HTTP/1.1".to_string()]
        );
    }

    #[test]
    fn test_fetch_http_error_is_feed_unavailable() {
        let server = TestServer::serve(vec![(404, Vec::new())]);
        let feed = BingFeed::new(local_client(), server.base_url.clone(), None);

        let err = feed.fetch(8).unwrap_err();
        assert!(matches!(err, ChangeError::FeedUnavailable(_)), "got {:?}", err);
    }

    #[test]
    fn test_thumbnail_url() {
        assert_eq!(
            thumbnail_url("https://www.bing.com/th?id=OHR.A_1920x1080.jpg&rf=x.jpg"),
            "https://www.bing.com/th?id=OHR.A_1920x1080.jpg&rf=x.jpg&w=384&h=216"
        );
        assert_eq!(
            thumbnail_url("https://cdn.example.com/second.jpg"),
            "https://cdn.example.com/second.jpg"
        );
    }

    #[test]
    fn test_thumbnail_downloads_resized_image() {
        let server = TestServer::serve(vec![(200, b"small".to_vec())]);
        let feed = BingFeed::new(local_client(), server.base_url.clone(), None);
        let candidate = Candidate {
            url: format!("{}/th?id=OHR.A_1920x1080.jpg", server.base_url),
            title: "A".to_string(),
            copyright: String::new(),
            start_date: "20240101".to_string(),
        };

        assert_eq!(feed.thumbnail(&candidate).unwrap(), b"small");
        assert_eq!(
            server.requests(),
            vec!["GET /th?id=OHR.A_1920x1080.jpg&w=384&h=216 HTTP/1.1".to_string()]
        );
    }
}
