//! # axum-seekable
//!
//! Serve a single local video file over HTTP with byte-range support, so
//! players and browsers can seek without downloading the whole file.
//!
//! The entry point is [`RangeStreamer`]: construct it with a file path and
//! optional MIME/filename overrides, then hand it the raw `Range` header
//! value of each request. It answers with either a [`StreamResponse`]
//! (a 200 or 206 with the right headers and a lazy body stream) or a
//! [`StreamError`] (a complete 204/404/416/500 response). Both sides of the
//! `Result` implement [`IntoResponse`], so an axum handler can return them
//! directly.
//!
//! Only single `bytes` ranges are supported: suffix ranges (`bytes=-N`),
//! open-ended ranges (`bytes=N-`), and explicit windows (`bytes=N-M`).
//! Multi-range requests are answered with 416.
//!
//! ```
//! use std::sync::Arc;
//!
//! use axum::Router;
//! use axum::extract::State;
//! use axum::http::{header, HeaderMap};
//! use axum::response::IntoResponse;
//! use axum::routing::get;
//!
//! use axum_seekable::RangeStreamer;
//!
//! async fn video(
//!     State(streamer): State<Arc<RangeStreamer>>,
//!     headers: HeaderMap,
//! ) -> impl IntoResponse {
//!     let range = headers.get(header::RANGE).and_then(|value| value.to_str().ok());
//!     match streamer.stream(range).await {
//!         Ok(response) => response.into_response(),
//!         Err(error) => error.into_response(),
//!     }
//! }
//!
//! let streamer = Arc::new(RangeStreamer::new("movie.mp4"));
//! let _app: Router = Router::new().route("/", get(video)).with_state(streamer);
//! ```

mod error;
mod file;
mod mime;
mod range;
mod stream;

use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::io::{AsyncRead, AsyncSeek};

pub use error::StreamError;
pub use file::VideoFile;
pub use range::ByteRange;
pub use stream::RangeStream;

/// [`AsyncSeek`] narrowed to only allow seeking from start.
pub trait AsyncSeekStart {
    /// Same semantics as [`AsyncSeek::start_seek`], always passing position as the `SeekFrom::Start` variant.
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()>;

    /// Same semantics as [`AsyncSeek::poll_complete`], returning `()` instead of the new stream position.
    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>>;
}

impl<T: AsyncSeek> AsyncSeekStart for T {
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()> {
        AsyncSeek::start_seek(self, io::SeekFrom::Start(position))
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        AsyncSeek::poll_complete(self, cx).map_ok(|_| ())
    }
}

/// An [`AsyncRead`] and [`AsyncSeekStart`] with a fixed known byte size.
///
/// [`VideoFile`] is the canonical implementation; the stream machinery is
/// generic over this trait so other sources can be windowed the same way.
pub trait RangeBody: AsyncRead + AsyncSeekStart {
    /// The total size of the underlying data.
    ///
    /// This should not change for the lifetime of the object once queried.
    /// Behaviour is not guaranteed if it does change.
    fn byte_size(&self) -> u64;
}

/// Streams a single local file over HTTP with byte-range support.
///
/// One value serves any number of requests: each call to [`stream`]
/// re-inspects the file, opens its own handle, and closes it when the body
/// finishes or the client goes away. No state is shared between requests.
///
/// [`stream`]: RangeStreamer::stream
#[derive(Debug, Clone)]
pub struct RangeStreamer {
    path: PathBuf,
    mime_type: Option<String>,
    output_filename: Option<String>,
}

impl RangeStreamer {
    /// Serve the file at `path`. The MIME type is derived from the
    /// extension unless overridden with [`mime_type`](Self::mime_type).
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RangeStreamer {
            path: path.into(),
            mime_type: None,
            output_filename: None,
        }
    }

    /// Declare the `Content-Type` to send, bypassing extension lookup.
    /// The value is passed through unvalidated.
    pub fn mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Filename offered in `Content-Disposition` on full responses.
    /// Defaults to the basename of the served path.
    pub fn output_filename(mut self, filename: impl Into<String>) -> Self {
        self.output_filename = Some(filename.into());
        self
    }

    /// Answer one request, given the raw `Range` header value if the client
    /// sent one.
    ///
    /// Preconditions run first (404 for a missing file, 204 for an empty
    /// one), then MIME resolution, then range parsing. A present and valid
    /// range yields a partial (206) response streaming only that window; no
    /// range yields a full (200) response streaming the whole file.
    pub async fn stream(
        &self,
        range_header: Option<&str>,
    ) -> Result<StreamResponse<VideoFile>, StreamError> {
        let file = VideoFile::open(&self.path).await?;
        let size = file.size();
        let content_type = mime::resolve_mime_type(self.mime_type.as_deref(), &self.path)?;

        match range_header {
            Some(header) => {
                let range = range::parse_range(header, size).inspect_err(|error| {
                    tracing::warn!(%error, header, size, "rejecting range request");
                })?;
                tracing::debug!(start = range.start, end = range.end, size, "serving byte range");
                let stream = RangeStream::new(file, range.start, range.len());
                Ok(StreamResponse::Partial { range, size, content_type, stream })
            }
            None => {
                tracing::debug!(size, "serving whole file");
                let filename = self
                    .output_filename
                    .clone()
                    .unwrap_or_else(|| default_filename(&self.path));
                let stream = RangeStream::new(file, 0, size);
                Ok(StreamResponse::Full { size, content_type, filename, stream })
            }
        }
    }
}

/// Basename after the last path separator, used when no output filename
/// was supplied.
fn default_filename(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_owned())
}

/// Computed headers and body for a successful response. Implements
/// [`IntoResponse`].
pub enum StreamResponse<B> {
    /// No range header was sent: the whole file, status 200.
    Full {
        size: u64,
        content_type: String,
        filename: String,
        stream: RangeStream<B>,
    },
    /// A valid range was sent: one byte window, status 206.
    Partial {
        range: ByteRange,
        size: u64,
        content_type: String,
        stream: RangeStream<B>,
    },
}

impl<B> std::fmt::Debug for StreamResponse<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamResponse::Full { size, content_type, filename, .. } => f
                .debug_struct("Full")
                .field("size", size)
                .field("content_type", content_type)
                .field("filename", filename)
                .finish_non_exhaustive(),
            StreamResponse::Partial { range, size, content_type, .. } => f
                .debug_struct("Partial")
                .field("range", range)
                .field("size", size)
                .field("content_type", content_type)
                .finish_non_exhaustive(),
        }
    }
}

impl<B: RangeBody + Send + 'static> IntoResponse for StreamResponse<B> {
    fn into_response(self) -> Response {
        match self {
            StreamResponse::Full { size, content_type, filename, stream } => {
                // quotes and backslashes would corrupt the quoted-string
                let filename = filename.replace(['"', '\\'], "");
                let headers = [
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                    (header::CONTENT_TYPE, content_type_value(&content_type)),
                    (header::CONTENT_LENGTH, HeaderValue::from(size)),
                    (
                        header::CONTENT_DISPOSITION,
                        HeaderValue::from_str(&format!("filename=\"{filename}\""))
                            .unwrap_or_else(|_| HeaderValue::from_static("filename=\"video\"")),
                    ),
                ];
                (StatusCode::OK, headers, stream).into_response()
            }
            StreamResponse::Partial { range, size, content_type, stream } => {
                let content_range = format!("bytes {}-{}/{}", range.start, range.end, size);
                let headers = [
                    (header::ACCEPT_RANGES, HeaderValue::from_static("bytes")),
                    (header::CONTENT_TYPE, content_type_value(&content_type)),
                    (
                        header::CONTENT_RANGE,
                        HeaderValue::from_str(&content_range)
                            .expect("content range string is always a valid header value"),
                    ),
                    (header::CONTENT_LENGTH, HeaderValue::from(range.len())),
                ];
                (StatusCode::PARTIAL_CONTENT, headers, stream).into_response()
            }
        }
    }
}

fn content_type_value(content_type: &str) -> HeaderValue {
    HeaderValue::from_str(content_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}
