mod common;

use eviction_export::storage::{Disposition, Visibility};
use eviction_export::{
    ExportCache, ExportConfig, ExportError, ExportFormat, MemoryStore, ObjectStore, Producer,
    ProducerSet, ReportContext, derive_key,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Spreadsheet stand-in that counts how often it runs.
struct CountingProducer {
    calls: Arc<AtomicUsize>,
}

impl Producer for CountingProducer {
    fn format(&self) -> ExportFormat {
        ExportFormat::Xlsx
    }

    fn template_key(&self) -> Option<&str> {
        Some("assets/template.xlsx")
    }

    fn create_file(&self, ctx: &ReportContext<'_>) -> eviction_export::Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("xlsx for {} features", ctx.request.features.len()).into_bytes())
    }
}

fn cache_with(store: Arc<dyn ObjectStore>, calls: Arc<AtomicUsize>) -> ExportCache {
    let producers = ProducerSet::new().with(CountingProducer { calls });
    ExportCache::new(ExportConfig::default(), store, producers).unwrap()
}

#[test]
fn second_request_is_served_from_storage() {
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = cache_with(store.clone(), calls.clone());
    let req = common::pa_ny_request(&["xlsx"]);

    let first = cache.get_or_create(&req, ExportFormat::Xlsx).unwrap();
    let second = cache.get_or_create(&req, ExportFormat::Xlsx).unwrap();

    assert_eq!(first, second);
    assert_eq!(
        first,
        "https://s3.amazonaws.com/eviction-lab-exports/en/2015/2010-2016/pr/er/42/36/eviction_lab_export.xlsx"
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.puts(), 1);

    let stored = store
        .object("eviction-lab-exports", &derive_key(&req, "xlsx"))
        .unwrap();
    assert_eq!(stored.bytes, b"xlsx for 2 features");
    assert_eq!(stored.visibility, Visibility::PublicRead);
    assert_eq!(stored.disposition, Disposition::Attachment);
}

/// Store whose existence check always fails.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
}

impl ObjectStore for FlakyStore {
    fn exists(&self, _bucket: &str, _key: &str) -> eviction_export::Result<bool> {
        Err(ExportError::Storage("existence check timed out".into()))
    }

    fn get(&self, bucket: &str, key: &str) -> eviction_export::Result<Vec<u8>> {
        self.inner.get(bucket, key)
    }

    fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: &[u8],
        visibility: Visibility,
        disposition: Disposition,
    ) -> eviction_export::Result<()> {
        self.inner.put(bucket, key, bytes, visibility, disposition)
    }
}

#[test]
fn failed_existence_check_counts_as_miss() {
    let store = Arc::new(FlakyStore::default());
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = cache_with(store.clone(), calls.clone());
    let req = common::pa_ny_request(&["xlsx"]);

    assert!(!cache.exists(&derive_key(&req, "xlsx")));
    cache.get_or_create(&req, ExportFormat::Xlsx).unwrap();
    cache.get_or_create(&req, ExportFormat::Xlsx).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.inner.puts(), 2);
}

/// Store that accepts no writes.
#[derive(Default)]
struct ReadOnlyStore;

impl ObjectStore for ReadOnlyStore {
    fn exists(&self, _bucket: &str, _key: &str) -> eviction_export::Result<bool> {
        Ok(false)
    }

    fn get(&self, bucket: &str, key: &str) -> eviction_export::Result<Vec<u8>> {
        Err(ExportError::Storage(format!("no object {bucket}/{key}")))
    }

    fn put(
        &self,
        _bucket: &str,
        _key: &str,
        _bytes: &[u8],
        _visibility: Visibility,
        _disposition: Disposition,
    ) -> eviction_export::Result<()> {
        Err(ExportError::Storage("access denied".into()))
    }
}

#[test]
fn upload_failure_propagates() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = cache_with(Arc::new(ReadOnlyStore), calls);
    let req = common::pa_ny_request(&["xlsx"]);
    let err = cache.get_or_create(&req, ExportFormat::Xlsx).unwrap_err();
    assert!(matches!(err, ExportError::Storage(_)));
}

#[test]
fn unregistered_format_is_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = cache_with(Arc::new(MemoryStore::new()), calls);
    let req = common::pa_ny_request(&["docx"]);
    let err = cache.get_or_create(&req, ExportFormat::Docx).unwrap_err();
    assert!(matches!(err, ExportError::UnknownFormat(f) if f == "docx"));
}

#[test]
fn invalid_request_is_rejected_before_storage() {
    let store = Arc::new(MemoryStore::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let cache = cache_with(store.clone(), calls);
    let mut req = common::pa_ny_request(&["xlsx"]);
    req.features.clear();
    assert!(matches!(
        cache.get_or_create(&req, ExportFormat::Xlsx),
        Err(ExportError::InvalidRequest(_))
    ));
    assert_eq!(store.puts(), 0);
}

#[test]
fn dev_stage_writes_dev_bucket() {
    let store = Arc::new(MemoryStore::new());
    let config = ExportConfig {
        stage: "dev".into(),
        ..ExportConfig::default()
    };
    let cache = ExportCache::new(config, store.clone(), ProducerSet::builtin()).unwrap();
    let req = common::pa_ny_request(&["csv"]);
    let url = cache.get_or_create(&req, ExportFormat::Csv).unwrap();
    assert!(url.contains("/eviction-lab-exports-dev/"));
    assert_eq!(store.keys("eviction-lab-exports-dev").len(), 1);
}
