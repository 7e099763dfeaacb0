use std::io;
use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project::pin_project;
use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};

use crate::error::StreamError;
use crate::{AsyncSeekStart, RangeBody};

/// A regular file that passed the streaming preconditions, with its size
/// captured at open time.
///
/// Opening runs the precondition checks in order: the path must name an
/// existing regular file ([`StreamError::NotFound`]) and the file must not
/// be empty ([`StreamError::EmptyFile`]). The size is read once per request;
/// nothing is cached across requests. Dropping the value closes the handle,
/// which is also how an aborted transfer releases it.
#[pin_project]
pub struct VideoFile {
    size: u64,
    #[pin]
    file: File,
}

impl std::fmt::Debug for VideoFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoFile").field("size", &self.size).finish()
    }
}

impl VideoFile {
    /// Open `path` for binary read, verifying the streaming preconditions.
    pub async fn open(path: impl AsRef<Path>) -> Result<VideoFile, StreamError> {
        let path = path.as_ref();

        let metadata = tokio::fs::metadata(path).await.map_err(not_found)?;
        if !metadata.is_file() {
            return Err(StreamError::NotFound);
        }
        if metadata.len() == 0 {
            return Err(StreamError::EmptyFile);
        }

        let file = File::open(path).await.map_err(not_found)?;
        Ok(VideoFile { size: metadata.len(), file })
    }

    /// Total size in bytes. Always non-zero.
    pub fn size(&self) -> u64 {
        self.size
    }
}

fn not_found(e: io::Error) -> StreamError {
    match e.kind() {
        io::ErrorKind::NotFound => StreamError::NotFound,
        _ => StreamError::Io(e),
    }
}

impl AsyncRead for VideoFile {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        self.project().file.poll_read(cx, buf)
    }
}

impl AsyncSeekStart for VideoFile {
    fn start_seek(self: Pin<&mut Self>, position: u64) -> io::Result<()> {
        self.project().file.start_seek(position)
    }

    fn poll_complete(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.project().file.poll_complete(cx)
    }
}

impl RangeBody for VideoFile {
    fn byte_size(&self) -> u64 {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::VideoFile;
    use crate::error::StreamError;

    #[tokio::test]
    async fn open_reports_file_size() {
        let file = VideoFile::open("test/fixture.mp4").await.unwrap();
        assert_eq!(62, file.size());
    }

    #[tokio::test]
    async fn missing_file_is_not_found() {
        let err = VideoFile::open("test/no-such-file.mp4").await.unwrap_err();
        assert_matches!(err, StreamError::NotFound);
    }

    #[tokio::test]
    async fn directory_is_not_found() {
        let err = VideoFile::open("test").await.unwrap_err();
        assert_matches!(err, StreamError::NotFound);
    }

    #[tokio::test]
    async fn empty_file_is_rejected() {
        let err = VideoFile::open("test/empty.webm").await.unwrap_err();
        assert_matches!(err, StreamError::EmptyFile);
    }
}
