//! On-demand image delivery.
//!
//! [`Deliverer::deliver`] answers one [`AssetRequest`] with image bytes in
//! the requested format and size, doing as little work as possible:
//!
//! ```text
//! validate format ──unsupported──▶ UnsupportedFormat (501)
//!       │
//! cache lookup ──hit──▶ respond with cached bytes
//!       │ miss
//! locate original ──none──▶ AssetNotFound (404)
//!       │
//! original format ──unknown extension──▶ CorruptOriginal (500)
//!       │
//! same format, no size? ──yes──▶ stream the original file unchanged
//!       │ no
//! decode → resize → encode ──failure──▶ CorruptOriginal / EncodingFailure (500)
//!       │
//! spawn cache write (detached), respond with the new bytes
//! ```
//!
//! The passthrough branch never re-encodes and never writes the cache: the
//! original is already the answer. The transform branch runs on a blocking
//! worker so a slow AVIF encode does not stall other requests.
//!
//! An encode that fails or produces no bytes is an error. An empty body is
//! never served as a successful response.

use crate::cache::CacheStore;
use crate::config::StorageConfig;
use crate::imaging::{ImageBackend, ImageFormat, RustBackend, TransformError, TransformSpec};
use crate::locate::{LocateError, find_candidates, select_original};
use crate::request::{AssetRequest, RequestError};
use crate::timing::RequestTimer;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] RequestError),
    #[error("image format {0:?} is not supported")]
    UnsupportedFormat(String),
    #[error("asset {0} not found")]
    AssetNotFound(String),
    #[error("original {} is unusable: {reason}", path.display())]
    CorruptOriginal { path: PathBuf, reason: String },
    #[error("failed to produce {format}: {reason}")]
    EncodingFailure { format: ImageFormat, reason: String },
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error("cannot read original {}: {source}", path.display())]
    ReadOriginal {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DeliveryError {
    /// HTTP status class for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::AssetNotFound(_) => 404,
            Self::UnsupportedFormat(_) => 501,
            Self::CorruptOriginal { .. }
            | Self::EncodingFailure { .. }
            | Self::Locate(_)
            | Self::ReadOriginal { .. } => 500,
        }
    }

    /// Whether the request itself was at fault.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

/// Where a delivered body came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Passthrough,
    Transformed,
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Cache => "cache",
            Self::Passthrough => "passthrough",
            Self::Transformed => "transformed",
        })
    }
}

/// Response body: bytes in memory, or the original file to stream.
///
/// The file handle is closed when the body is dropped, including when a
/// caller abandons it halfway through streaming.
#[derive(Debug)]
pub enum Body {
    Bytes(Bytes),
    File(tokio::fs::File),
}

impl Body {
    /// Stream the body into `out`, returning the number of bytes written.
    pub async fn write_to<W>(self, out: &mut W) -> io::Result<u64>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        match self {
            Self::Bytes(bytes) => {
                out.write_all(&bytes).await?;
                Ok(bytes.len() as u64)
            }
            Self::File(mut file) => tokio::io::copy(&mut file, out).await,
        }
    }

    /// Collect the whole body in memory.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::File(mut file) => {
                let mut buf = Vec::new();
                file.read_to_end(&mut buf).await?;
                Ok(Bytes::from(buf))
            }
        }
    }
}

/// A successful delivery.
#[derive(Debug)]
pub struct Delivery {
    pub format: ImageFormat,
    pub source: Source,
    pub body: Body,
    /// The detached cache write started for a transformed result. Awaiting
    /// it is optional; dropping it leaves the write running.
    pub cache_write: Option<JoinHandle<()>>,
}

impl Delivery {
    /// Value for the `Content-Type` header.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// The delivery orchestrator.
///
/// Holds no per-request state and can be shared across tasks behind an
/// `Arc`. Concurrent misses on one key each transform and each write; the
/// results are identical, so the last write winning is harmless.
pub struct Deliverer<B = RustBackend> {
    originals_dir: PathBuf,
    cache: CacheStore,
    backend: Arc<B>,
}

impl Deliverer<RustBackend> {
    pub fn new(originals_dir: impl Into<PathBuf>, cache: CacheStore) -> Self {
        Self::with_backend(originals_dir, cache, Arc::new(RustBackend::new()))
    }

    pub fn from_config(storage: &StorageConfig) -> Self {
        let mut cache = CacheStore::new(&storage.cache_dir);
        if let Some(seed) = &storage.seed_cache_dir {
            cache = cache.with_seed_dir(seed);
        }
        Self::new(&storage.originals_dir, cache)
    }
}

impl<B: ImageBackend + 'static> Deliverer<B> {
    pub fn with_backend(
        originals_dir: impl Into<PathBuf>,
        cache: CacheStore,
        backend: Arc<B>,
    ) -> Self {
        Self {
            originals_dir: originals_dir.into(),
            cache,
            backend,
        }
    }

    pub fn originals_dir(&self) -> &Path {
        &self.originals_dir
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Answer one request. See the [module docs](self) for the decision tree.
    #[tracing::instrument(
        name = "deliver",
        skip_all,
        fields(asset = request.asset_id(), format = request.format())
    )]
    pub async fn deliver(&self, request: &AssetRequest) -> Result<Delivery, DeliveryError> {
        let mut timer = RequestTimer::start();
        let result = self.run(request, &mut timer).await;
        timer.report();
        match &result {
            Ok(delivery) => tracing::info!(source = %delivery.source, "delivered"),
            Err(e) if e.is_client_error() || e.status_code() == 501 => {
                tracing::info!(status = e.status_code(), error = %e, "rejected")
            }
            Err(e) => tracing::error!(status = e.status_code(), error = %e, "delivery failed"),
        }
        result
    }

    async fn run(
        &self,
        request: &AssetRequest,
        timer: &mut RequestTimer,
    ) -> Result<Delivery, DeliveryError> {
        let format = ImageFormat::from_token(request.format())
            .ok_or_else(|| DeliveryError::UnsupportedFormat(request.format().to_string()))?;
        timer.mark("validate");

        let key = self.cache.key(
            request.asset_id(),
            format,
            request.width(),
            request.height(),
        );
        let cached = self.cache.read(&key).await;
        timer.mark("cache_lookup");
        if let Some(bytes) = cached {
            tracing::debug!(key = %key, "cache hit");
            return Ok(Delivery {
                format,
                source: Source::Cache,
                body: Body::Bytes(bytes),
                cache_write: None,
            });
        }
        tracing::debug!(key = %key, "cache miss");

        let candidates = find_candidates(&self.originals_dir, request.asset_id()).await?;
        let original = select_original(&candidates, format)
            .cloned()
            .ok_or_else(|| DeliveryError::AssetNotFound(request.asset_id().to_string()))?;
        timer.mark("locate");
        if candidates.len() > 1 {
            tracing::debug!(
                candidates = candidates.len(),
                chosen = %original.display(),
                "several originals share this id"
            );
        }

        let original_format =
            ImageFormat::from_path(&original).ok_or_else(|| DeliveryError::CorruptOriginal {
                path: original.clone(),
                reason: "extension is not a supported image format".into(),
            })?;

        if original_format == format && !request.has_dimensions() {
            let file = tokio::fs::File::open(&original)
                .await
                .map_err(|e| read_error(request, &original, e))?;
            timer.mark("open_original");
            tracing::debug!(original = %original.display(), "passthrough");
            return Ok(Delivery {
                format,
                source: Source::Passthrough,
                body: Body::File(file),
                cache_write: None,
            });
        }

        let bytes = tokio::fs::read(&original)
            .await
            .map_err(|e| read_error(request, &original, e))?;
        timer.mark("read_original");

        let encoded = self
            .transform(
                bytes,
                TransformSpec {
                    source_format: original_format,
                    target_format: format,
                    width: request.width(),
                    height: request.height(),
                },
                &original,
            )
            .await?;
        timer.mark("transform");

        let cache_write = self.cache.spawn_write(key, encoded.clone());
        Ok(Delivery {
            format,
            source: Source::Transformed,
            body: Body::Bytes(encoded),
            cache_write: Some(cache_write),
        })
    }

    /// Run the transform engine on a blocking worker.
    async fn transform(
        &self,
        original_bytes: Vec<u8>,
        spec: TransformSpec,
        original: &Path,
    ) -> Result<Bytes, DeliveryError> {
        let format = spec.target_format;
        let backend = Arc::clone(&self.backend);
        let outcome = tokio::task::spawn_blocking(move || {
            crate::imaging::transform(&*backend, &original_bytes, &spec)
        })
        .await
        .map_err(|e| DeliveryError::EncodingFailure {
            format,
            reason: format!("transform task failed: {e}"),
        })?;

        let encoded = outcome.map_err(|e| match e {
            TransformError::Decode(source) => DeliveryError::CorruptOriginal {
                path: original.to_path_buf(),
                reason: source.to_string(),
            },
            other @ (TransformError::Resize(_) | TransformError::Encode(_)) => {
                DeliveryError::EncodingFailure {
                    format,
                    reason: other.to_string(),
                }
            }
        })?;

        if encoded.is_empty() {
            return Err(DeliveryError::EncodingFailure {
                format,
                reason: "encoder produced no data".into(),
            });
        }
        Ok(Bytes::from(encoded))
    }
}

/// An original that vanished between listing and reading is simply gone.
fn read_error(request: &AssetRequest, path: &Path, source: io::Error) -> DeliveryError {
    if source.kind() == io::ErrorKind::NotFound {
        DeliveryError::AssetNotFound(request.asset_id().to_string())
    } else {
        DeliveryError::ReadOriginal {
            path: path.to_path_buf(),
            source,
        }
    }
}
