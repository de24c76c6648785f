//! S3-compatible object store backend using Apache OpenDAL.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                     Apache OpenDAL                         │
//! │                 (S3 service + TimeoutLayer)                │
//! ├───────────────────────────────────────────────────────────┤
//! │ write  → op.write_with(key, bytes).content_type(..)        │
//! │ read   → op.stat(key) + op.read(key)                       │
//! │ head   → op.stat(key)                                      │
//! └───────────────────────────────────────────────────────────┘
//! ```

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use opendal::layers::TimeoutLayer;
use opendal::{ErrorKind, Metadata, Operator, services};

use super::backend::{BlobBackend, BlobContent, BlobMetadata};
use super::error::StorageError;
use super::identifier::content_type_for_key;

/// Connection parameters for an S3-compatible store.
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// Endpoint override for self-hosted stores.
    pub endpoint: Option<String>,
    /// Bucket name.
    pub bucket: String,
    /// Access key ID.
    pub access_key_id: String,
    /// Secret access key.
    pub secret_access_key: String,
    /// Region.
    pub region: String,
    /// Key prefix.
    pub prefix: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// Object store backend. Holds one operator for the process lifetime.
#[derive(Debug, Clone)]
pub struct ObjectStoreBackend {
    operator: Operator,
}

#[derive(Clone, Copy)]
enum Op {
    Write,
    Read,
}

impl ObjectStoreBackend {
    /// Build the operator. No network traffic happens here.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if OpenDAL rejects the settings.
    pub fn new(settings: &S3Settings) -> Result<Self, StorageError> {
        let mut builder = services::S3::default()
            .root(&format!("/{}", settings.prefix.trim_matches('/')))
            .bucket(&settings.bucket)
            .region(&settings.region)
            .access_key_id(&settings.access_key_id)
            .secret_access_key(&settings.secret_access_key)
            .disable_config_load();

        if let Some(endpoint) = &settings.endpoint {
            builder = builder.endpoint(endpoint);
        }

        let operator = Operator::new(builder)
            .map_err(|e| StorageError::configuration(e.to_string()))?
            .layer(
                TimeoutLayer::new()
                    .with_timeout(settings.timeout)
                    .with_io_timeout(settings.timeout),
            )
            .finish();

        Ok(Self { operator })
    }
}

/// Normalize an OpenDAL error into the storage taxonomy.
fn map_error(err: &opendal::Error, key: &str, op: Op) -> StorageError {
    match err.kind() {
        ErrorKind::NotFound => StorageError::not_found(key),
        ErrorKind::PermissionDenied | ErrorKind::ConfigInvalid | ErrorKind::RateLimited => {
            StorageError::unavailable(err.to_string())
        }
        _ if err.is_temporary() => StorageError::unavailable(err.to_string()),
        _ => match op {
            Op::Write => StorageError::write_failed(err.to_string()),
            Op::Read => StorageError::read_failed(err.to_string()),
        },
    }
}

fn content_disposition(original_name: &str) -> String {
    format!("attachment; filename=\"{original_name}\"")
}

/// Recover the filename from a `Content-Disposition` value we wrote.
fn filename_from_disposition(value: &str) -> Option<String> {
    let (_, rest) = value.split_once("filename=")?;
    let name = rest.split(';').next()?.trim().trim_matches('"');
    (!name.is_empty()).then(|| name.to_string())
}

fn describe(key: &str, meta: &Metadata) -> BlobMetadata {
    BlobMetadata {
        size: meta.content_length(),
        content_type: meta
            .content_type()
            .map_or_else(|| content_type_for_key(key).to_string(), String::from),
        last_modified: meta.last_modified().map(|t| t.to_string()),
        original_name: meta.content_disposition().and_then(filename_from_disposition),
    }
}

#[async_trait]
impl BlobBackend for ObjectStoreBackend {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn write(
        &self,
        key: &str,
        bytes: Bytes,
        content_type: &str,
        original_name: &str,
    ) -> Result<(), StorageError> {
        self.operator
            .write_with(key, bytes)
            .content_type(content_type)
            .content_disposition(&content_disposition(original_name))
            .await
            .map(|_| ())
            .map_err(|e| map_error(&e, key, Op::Write))
    }

    async fn read(&self, key: &str) -> Result<BlobContent, StorageError> {
        let meta = self
            .operator
            .stat(key)
            .await
            .map_err(|e| map_error(&e, key, Op::Read))?;
        let buffer = self
            .operator
            .read(key)
            .await
            .map_err(|e| map_error(&e, key, Op::Read))?;

        let described = describe(key, &meta);
        Ok(BlobContent {
            bytes: buffer.to_bytes(),
            content_type: described.content_type,
            original_name: described.original_name,
        })
    }

    async fn head(&self, key: &str) -> Result<BlobMetadata, StorageError> {
        let meta = self
            .operator
            .stat(key)
            .await
            .map_err(|e| map_error(&e, key, Op::Read))?;
        Ok(describe(key, &meta))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::net::SocketAddr;
    use std::time::Instant;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    const ACCESS_DENIED: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
        <Error><Code>InvalidAccessKeyId</Code>\
        <Message>The AWS Access Key Id you provided does not exist in our records.</Message>\
        </Error>";

    /// Read one HTTP request, headers and any `Content-Length` body.
    async fn read_request(stream: &mut TcpStream) -> std::io::Result<()> {
        let mut buf = Vec::new();
        let mut chunk = [0_u8; 4096];
        loop {
            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                return Ok(());
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|l| l.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while buf.len() < end + 4 + body_len {
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                buf.extend_from_slice(&chunk[..n]);
            }
            return Ok(());
        }
    }

    /// Store that accepts connections and never answers.
    async fn silent_store() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut chunk = [0_u8; 4096];
                    while matches!(stream.read(&mut chunk).await, Ok(n) if n > 0) {}
                });
            }
        });
        addr
    }

    /// Store that rejects every request with an S3 `403 InvalidAccessKeyId`.
    async fn forbidding_store() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            while let Ok((mut stream, _)) = listener.accept().await {
                tokio::spawn(async move {
                    if read_request(&mut stream).await.is_err() {
                        return;
                    }
                    let response = format!(
                        "HTTP/1.1 403 Forbidden\r\n\
                         Content-Type: application/xml\r\n\
                         Content-Length: {}\r\n\
                         Connection: close\r\n\r\n{ACCESS_DENIED}",
                        ACCESS_DENIED.len()
                    );
                    let _ = stream.write_all(response.as_bytes()).await;
                    let _ = stream.shutdown().await;
                });
            }
        });
        addr
    }

    fn settings(endpoint: &str) -> S3Settings {
        S3Settings {
            endpoint: Some(endpoint.to_string()),
            bucket: "files".to_string(),
            access_key_id: "invalid".to_string(),
            secret_access_key: "invalid".to_string(),
            region: "us-east-1".to_string(),
            prefix: "uploads/".to_string(),
            timeout: Duration::from_secs(2),
        }
    }

    #[rstest]
    #[case(ErrorKind::PermissionDenied)]
    #[case(ErrorKind::ConfigInvalid)]
    #[case(ErrorKind::RateLimited)]
    fn test_credential_and_config_errors_are_unavailable(#[case] kind: ErrorKind) {
        let err = opendal::Error::new(kind, "denied");
        assert!(matches!(
            map_error(&err, "a.txt", Op::Write),
            StorageError::BackendUnavailable(_)
        ));
    }

    #[test]
    fn test_not_found_maps_to_not_found() {
        let err = opendal::Error::new(ErrorKind::NotFound, "no such key");
        let mapped = map_error(&err, "a.txt", Op::Read);
        assert!(matches!(mapped, StorageError::NotFound { ref key } if key == "a.txt"));
    }

    #[test]
    fn test_temporary_errors_are_unavailable() {
        let err = opendal::Error::new(ErrorKind::Unexpected, "connection refused").set_temporary();
        assert!(matches!(
            map_error(&err, "a.txt", Op::Read),
            StorageError::BackendUnavailable(_)
        ));
    }

    #[test]
    fn test_other_errors_keep_operation_and_message() {
        let err = opendal::Error::new(ErrorKind::Unexpected, "quota exceeded");
        let write = map_error(&err, "a.txt", Op::Write);
        assert!(matches!(write, StorageError::WriteFailed(ref m) if m.contains("quota exceeded")));
        let read = map_error(&err, "a.txt", Op::Read);
        assert!(matches!(read, StorageError::ReadFailed(ref m) if m.contains("quota exceeded")));
    }

    #[test]
    fn test_disposition_round_trip() {
        let value = content_disposition("report.pdf");
        assert_eq!(value, "attachment; filename=\"report.pdf\"");
        assert_eq!(
            filename_from_disposition(&value).as_deref(),
            Some("report.pdf")
        );
        assert_eq!(filename_from_disposition("inline"), None);
        assert_eq!(filename_from_disposition("attachment; filename=\"\""), None);
    }

    #[test]
    fn test_new_accepts_endpoint_override() {
        let backend = ObjectStoreBackend::new(&settings("http://127.0.0.1:9000"));
        assert!(backend.is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_store_is_unavailable_within_timeout() {
        let backend = ObjectStoreBackend::new(&settings("http://127.0.0.1:1")).expect("build");

        let started = Instant::now();
        let err = backend
            .write("a.txt", Bytes::from_static(b"data"), "text/plain", "a.txt")
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::BackendUnavailable(_)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_silent_store_times_out_as_unavailable() {
        let addr = silent_store().await;
        let timeout = Duration::from_secs(1);
        let backend = ObjectStoreBackend::new(&S3Settings {
            timeout,
            ..settings(&format!("http://{addr}"))
        })
        .expect("build");

        let started = Instant::now();
        let err = backend
            .write("a.txt", Bytes::from_static(b"data"), "text/plain", "a.txt")
            .await
            .unwrap_err();
        let elapsed = started.elapsed();
        assert!(matches!(err, StorageError::BackendUnavailable(_)), "{err}");
        assert!(elapsed >= timeout, "returned after {elapsed:?}");
        assert!(elapsed < timeout * 4, "returned after {elapsed:?}");

        let started = Instant::now();
        let err = backend.head("a.txt").await.unwrap_err();
        let elapsed = started.elapsed();
        assert!(matches!(err, StorageError::BackendUnavailable(_)), "{err}");
        assert!(elapsed >= timeout, "returned after {elapsed:?}");
        assert!(elapsed < timeout * 4, "returned after {elapsed:?}");
    }

    #[tokio::test]
    async fn test_rejected_credentials_are_unavailable() {
        let addr = forbidding_store().await;
        let backend = ObjectStoreBackend::new(&settings(&format!("http://{addr}"))).expect("build");

        let err = backend
            .write("a.txt", Bytes::from_static(b"data"), "text/plain", "a.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::BackendUnavailable(_)), "{err}");

        let err = backend.head("a.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::BackendUnavailable(_)), "{err}");

        let err = backend.read("a.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::BackendUnavailable(_)), "{err}");
    }
}
