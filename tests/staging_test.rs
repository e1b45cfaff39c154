use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use jobbin::binaries::{
    InternalDbType, JobBinaryError, JobBinaryReference, JobBinaryType, RetrievalContext,
    StageContext, ValidationContext,
};
use jobbin::credentials::CredentialResolver;
use jobbin::fetcher::{FetchSettings, SizeGuardedFetcher, SizeLimit};
use jobbin::observability::Metrics;
use jobbin::remote::{LocalRemote, RemoteWriteError, RemoteWriter};
use jobbin::secrets::StaticSecretStore;
use jobbin::storage::{StorageClient, StorageSessionFactory};

#[derive(Default)]
struct RecordingRemote {
    writes: Mutex<Vec<(String, Bytes)>>,
}

#[async_trait]
impl RemoteWriter for RecordingRemote {
    async fn write_file(&self, path: &str, data: Bytes) -> Result<(), RemoteWriteError> {
        self.writes.lock().unwrap().push((path.to_string(), data));
        Ok(())
    }
}

struct FailingRemote;

#[async_trait]
impl RemoteWriter for FailingRemote {
    async fn write_file(&self, _: &str, _: Bytes) -> Result<(), RemoteWriteError> {
        Err(RemoteWriteError::Remote("host unreachable".to_string()))
    }
}

fn internal_db(limit_kb: u64) -> InternalDbType {
    let store = StorageClient::in_memory("internal");
    let fetcher = SizeGuardedFetcher::new(
        FetchSettings::new(SizeLimit::from_kb(limit_kb), Duration::from_secs(5)),
        CredentialResolver::new(Arc::new(StaticSecretStore::new())),
        Arc::new(StorageSessionFactory::new(StorageClient::in_memory("swift"))),
        Arc::new(Metrics::new()),
    );
    InternalDbType::new(store, fetcher)
}

#[tokio::test]
async fn test_upload_then_copy_to_cluster() {
    let db = internal_db(1024);
    let url = db.upload(Bytes::from_static(b"jar bytes")).await.unwrap();

    let reference = JobBinaryReference::new(&url)
        .with_id("jb-7")
        .with_name("wordcount.jar");
    db.validate(&reference, &ValidationContext::creating())
        .await
        .unwrap();

    let remote = Arc::new(RecordingRemote::default());
    let staging = StageContext::new(remote.clone());

    let path = db
        .copy_binary_to_cluster(&reference, "/tmp", &RetrievalContext::new(), &staging)
        .await
        .unwrap();

    assert_eq!(path, "/tmp/jb-7-wordcount.jar");
    let writes = remote.writes.lock().unwrap().clone();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].0, path);
    assert_eq!(&writes[0].1[..], b"jar bytes");
}

#[tokio::test]
async fn test_stage_onto_local_remote() {
    let temp_dir = TempDir::new().unwrap();
    let db = internal_db(1024);
    let url = db.upload(Bytes::from_static(b"payload")).await.unwrap();
    let reference = JobBinaryReference::new(&url)
        .with_id("jb-8")
        .with_name("job.py");

    let staging = StageContext::new(Arc::new(LocalRemote::new(temp_dir.path())));
    let path = db
        .copy_binary_to_cluster(&reference, "/opt/jobs", &RetrievalContext::new(), &staging)
        .await
        .unwrap();

    assert_eq!(path, "/opt/jobs/jb-8-job.py");
    let written = std::fs::read(temp_dir.path().join("opt/jobs/jb-8-job.py")).unwrap();
    assert_eq!(written, b"payload");
}

#[tokio::test]
async fn test_remote_failure_is_reported() {
    let db = internal_db(1024);
    let url = db.upload(Bytes::from_static(b"payload")).await.unwrap();
    let reference = JobBinaryReference::new(&url).with_id("jb-9").with_name("a.jar");

    let result = db
        .copy_binary_to_cluster(
            &reference,
            "/tmp",
            &RetrievalContext::new(),
            &StageContext::new(Arc::new(FailingRemote)),
        )
        .await;

    assert!(matches!(result, Err(JobBinaryError::RemoteWrite { .. })));
}

#[tokio::test]
async fn test_cancelled_staging_writes_nothing() {
    let db = internal_db(1024);
    let url = db.upload(Bytes::from_static(b"payload")).await.unwrap();
    let reference = JobBinaryReference::new(&url).with_id("jb-3").with_name("a.jar");

    let cancel = CancellationToken::new();
    cancel.cancel();
    let remote = Arc::new(RecordingRemote::default());
    let staging = StageContext::new(remote.clone()).with_cancellation(cancel);

    let result = db
        .stage(&reference, Bytes::from_static(b"payload"), "/tmp", &staging)
        .await;

    assert!(matches!(result, Err(JobBinaryError::Cancelled { .. })));
    assert!(remote.writes.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upload_over_limit_is_rejected() {
    let db = internal_db(1);
    let result = db.upload(Bytes::from(vec![0u8; 2048])).await;

    assert!(matches!(
        result,
        Err(JobBinaryError::ArtifactTooLarge { limit_kb: 1, .. })
    ));
}
