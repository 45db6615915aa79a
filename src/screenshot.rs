//! Client for the map screenshot service.
//!
//! A failed or missing screenshot never fails an export; callers get `None` and draw a
//! placeholder instead.

use log::{debug, warn};
use reqwest::blocking::Client as HttpClient;
use std::time::Duration;

use crate::models::Feature;

/// Pixel size the feature slides request (twice the slide's 322px box).
pub const SCREENSHOT_SIZE_PX: u32 = 644;

#[derive(Debug, Clone)]
pub struct ScreenshotClient {
    pub base_url: String,
    http: HttpClient,
}

impl ScreenshotClient {
    pub fn new(base_url: impl Into<String>) -> crate::Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    /// `None` when the feature has no bounding box.
    pub fn url(
        &self,
        feature: &Feature,
        data_stat: &str,
        bubble_stat: &str,
        year_suffix: &str,
        index: usize,
        width: u32,
        height: u32,
    ) -> Option<String> {
        let b = feature.bbox?;
        Some(format!(
            "{}/{}/{}/{}/{}/{}/{}-{}/{}-{}/{}/{}?width={}&height={}",
            self.base_url.trim_end_matches('/'),
            b.north,
            b.south,
            b.east,
            b.west,
            feature.layer.as_str(),
            data_stat,
            year_suffix,
            bubble_stat,
            year_suffix,
            feature.geoid,
            index,
            width,
            height
        ))
    }

    /// Raster bytes of the map around `feature`, or `None` on any failure.
    pub fn fetch(
        &self,
        feature: &Feature,
        data_stat: &str,
        bubble_stat: &str,
        year_suffix: &str,
        index: usize,
    ) -> Option<Vec<u8>> {
        let url = self.url(
            feature,
            data_stat,
            bubble_stat,
            year_suffix,
            index,
            SCREENSHOT_SIZE_PX,
            SCREENSHOT_SIZE_PX,
        )?;
        debug!("fetching screenshot {url}");
        let resp = match self.http.get(&url).send() {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                warn!("screenshot {url} returned HTTP {}", r.status());
                return None;
            }
            Err(e) => {
                warn!("screenshot {url} failed: {e}");
                return None;
            }
        };
        match resp.bytes() {
            Ok(b) => Some(b.to_vec()),
            Err(e) => {
                warn!("screenshot {url} body unreadable: {e}");
                None
            }
        }
    }
}
