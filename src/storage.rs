//! Key-addressed object storage.
//!
//! `HttpObjectStore` speaks path-style S3 (`{endpoint}/{bucket}/{key}`) over the blocking
//! reqwest client; `MemoryStore` keeps objects in a map and counts writes for tests.

use ahash::AHashMap;
use parking_lot::RwLock;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use reqwest::redirect::Policy;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{ExportError, Result};

/// Canned ACL applied on upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    PublicRead,
    Private,
}

impl Visibility {
    pub fn acl(&self) -> &'static str {
        match self {
            Visibility::PublicRead => "public-read",
            Visibility::Private => "private",
        }
    }
}

/// How browsers should treat the object when the URL is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Attachment,
    Inline,
}

impl Disposition {
    pub fn header_value(&self, key: &str) -> String {
        let filename = key.rsplit('/').next().unwrap_or(key);
        match self {
            Disposition::Attachment => format!("attachment; filename=\"{filename}\""),
            Disposition::Inline => "inline".to_string(),
        }
    }
}

/// Content type for an export extension.
pub fn content_type(key: &str) -> &'static str {
    match key.rsplit('.').next().unwrap_or_default() {
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "csv" => "text/csv",
        "html" => "text/html; charset=utf-8",
        "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "png" => "image/png",
        "svg" => "image/svg+xml",
        _ => "application/octet-stream",
    }
}

pub trait ObjectStore: Send + Sync {
    fn exists(&self, bucket: &str, key: &str) -> Result<bool>;

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        visibility: Visibility,
        disposition: Disposition,
    ) -> Result<()>;
}

// Keys are '/'-joined paths; keep the separators and the usual filename punctuation.
const KEY_SAFE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.');

#[derive(Debug, Clone)]
pub struct HttpObjectStore {
    pub endpoint: String,
    http: HttpClient,
}

impl HttpObjectStore {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(60))
            .connect_timeout(Duration::from_secs(10))
            .redirect(Policy::limited(5))
            .user_agent(concat!("eviction-export/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            endpoint: endpoint.into(),
            http,
        })
    }

    fn url(&self, bucket: &str, key: &str) -> String {
        format!(
            "{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            bucket,
            percent_encoding::utf8_percent_encode(key, KEY_SAFE)
        )
    }
}

impl ObjectStore for HttpObjectStore {
    fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        let resp = self.http.head(self.url(bucket, key)).send()?;
        match resp.status() {
            s if s.is_success() => Ok(true),
            StatusCode::NOT_FOUND | StatusCode::FORBIDDEN => Ok(false),
            s => Err(ExportError::Storage(format!("HEAD {bucket}/{key}: HTTP {s}"))),
        }
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let resp = self.http.get(self.url(bucket, key)).send()?;
        if !resp.status().is_success() {
            return Err(ExportError::Storage(format!(
                "GET {bucket}/{key}: HTTP {}",
                resp.status()
            )));
        }
        Ok(resp.bytes()?.to_vec())
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        visibility: Visibility,
        disposition: Disposition,
    ) -> Result<()> {
        let resp = self
            .http
            .put(self.url(bucket, key))
            .header("x-amz-acl", visibility.acl())
            .header("Content-Disposition", disposition.header_value(key))
            .header("Content-Type", content_type(key))
            .body(bytes.to_vec())
            .send()?;
        if !resp.status().is_success() {
            return Err(ExportError::Storage(format!(
                "PUT {bucket}/{key}: HTTP {}",
                resp.status()
            )));
        }
        Ok(())
    }
}

/// A stored object with the metadata it was written with.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub visibility: Visibility,
    pub disposition: Disposition,
}

/// In-process store; `puts()` counts every write.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: RwLock<AHashMap<(String, String), StoredObject>>,
    puts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let mut keys: Vec<String> = self
            .objects
            .read()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }
}

impl ObjectStore for MemoryStore {
    fn exists(&self, bucket: &str, key: &str) -> Result<bool> {
        Ok(self
            .objects
            .read()
            .contains_key(&(bucket.to_string(), key.to_string())))
    }

    fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.object(bucket, key)
            .map(|o| o.bytes)
            .ok_or_else(|| ExportError::Storage(format!("no object {bucket}/{key}")))
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        visibility: Visibility,
        disposition: Disposition,
    ) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.objects.write().insert(
            (bucket.to_string(), key.to_string()),
            StoredObject {
                bytes: bytes.to_vec(),
                visibility,
                disposition,
            },
        );
        Ok(())
    }
}
