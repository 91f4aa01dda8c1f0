//! Multipart uploads with progress reporting
//!
//! Files are kept in memory as `Bytes` so a request can be rebuilt for the
//! retry after a token refresh. Each file part is streamed in fixed-size
//! chunks; the progress callback fires as the transport pulls each chunk.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use reqwest::multipart::{Form, Part};

use crate::error::{Error, Result};

/// Part name used by single-file uploads.
pub const SINGLE_FILE_FIELD: &str = "file";

const CHUNK_SIZE: usize = 64 * 1024;

/// One file to send.
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk, naming the part after the file.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(file_name, bytes))
    }
}

/// File bytes handed to the transport so far, across all parts of one
/// attempt. Multipart framing is not counted. A retry after a token
/// refresh starts again from zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub sent: u64,
    pub total: u64,
}

/// Progress callback.
pub type ProgressFn = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Multipart payload that can be turned into a fresh `Form` per attempt.
#[derive(Debug, Clone)]
pub(crate) struct MultipartBody {
    pub field: String,
    pub files: Vec<UploadFile>,
}

impl MultipartBody {
    pub(crate) fn total_len(&self) -> u64 {
        self.files.iter().map(|f| f.bytes.len() as u64).sum()
    }

    pub(crate) fn to_form(&self, progress: Option<&ProgressFn>) -> Result<Form> {
        let total = self.total_len();
        let sent = Arc::new(AtomicU64::new(0));
        let mut form = Form::new();

        for file in &self.files {
            let stream = chunked(file.bytes.clone(), sent.clone(), total, progress.cloned());
            let mut part = Part::stream_with_length(
                reqwest::Body::wrap_stream(stream),
                file.bytes.len() as u64,
            )
            .file_name(file.file_name.clone());
            if let Some(content_type) = &file.content_type {
                part = part.mime_str(content_type).map_err(|e| {
                    Error::InvalidRequest(format!("invalid content type {content_type}: {e}"))
                })?;
            }
            form = form.part(self.field.clone(), part);
        }

        Ok(form)
    }
}

fn chunked(
    bytes: Bytes,
    sent: Arc<AtomicU64>,
    total: u64,
    progress: Option<ProgressFn>,
) -> impl Stream<Item = std::result::Result<Bytes, std::io::Error>> + Send + 'static {
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + CHUNK_SIZE).min(bytes.len())))
        .collect();

    futures_util::stream::iter(chunks).map(move |chunk| {
        let len = chunk.len() as u64;
        let so_far = sent.fetch_add(len, Ordering::Relaxed) + len;
        if let Some(progress) = &progress {
            progress(UploadProgress {
                sent: so_far,
                total,
            });
        }
        Ok(chunk)
    })
}
