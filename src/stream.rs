use std::{io, mem};
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::{IntoResponse, Response};
use bytes::{Bytes, BytesMut};
use futures::Stream;
use http_body::{Body, Frame, SizeHint};
use pin_project::pin_project;
use tokio::io::ReadBuf;

use crate::RangeBody;

/// Chunk size for the read loop. Each chunk is handed to the transport as
/// soon as it is read, so memory use is bounded by this regardless of file
/// size.
const CHUNK_SIZE: usize = 8 * 1024;

/// Body stream for a single byte window of a [`RangeBody`].
///
/// Seeks to the window start, then reads and yields chunks until exactly
/// `length` bytes have been emitted. The stream is finite and cannot be
/// restarted; a dropped stream (client disconnect) releases the underlying
/// handle without further reads. Implements [`Stream`], [`Body`], and
/// [`IntoResponse`].
#[pin_project]
pub struct RangeStream<B> {
    state: StreamState,
    length: u64,
    #[pin]
    body: B,
}

impl<B: RangeBody + Send + 'static> RangeStream<B> {
    /// Stream `length` bytes of `body` starting at byte `start`.
    ///
    /// The caller is responsible for having validated the window against
    /// [`RangeBody::byte_size`].
    pub fn new(body: B, start: u64, length: u64) -> Self {
        RangeStream {
            state: StreamState::Seek { start },
            length,
            body,
        }
    }
}

#[derive(Debug)]
enum StreamState {
    Seek { start: u64 },
    Seeking { remaining: u64 },
    Reading { buffer: BytesMut, remaining: u64 },
}

impl<B: RangeBody + Send + 'static> IntoResponse for RangeStream<B> {
    fn into_response(self) -> Response {
        Response::new(axum::body::Body::new(self))
    }
}

impl<B: RangeBody> Body for RangeStream<B> {
    type Data = Bytes;
    type Error = io::Error;

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.length)
    }

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<io::Result<Frame<Bytes>>>> {
        self.poll_next(cx).map(|item| item.map(|result| result.map(Frame::data)))
    }
}

impl<B: RangeBody> Stream for RangeStream<B> {
    type Item = io::Result<Bytes>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<io::Result<Bytes>>> {
        let mut this = self.project();

        if let StreamState::Seek { start } = *this.state {
            match this.body.as_mut().start_seek(start) {
                Err(e) => { return Poll::Ready(Some(Err(e))); }
                Ok(()) => {
                    let remaining = *this.length;
                    *this.state = StreamState::Seeking { remaining };
                }
            }
        }

        if let StreamState::Seeking { remaining } = *this.state {
            match this.body.as_mut().poll_complete(cx) {
                Poll::Pending => { return Poll::Pending; }
                Poll::Ready(Err(e)) => { return Poll::Ready(Some(Err(e))); }
                Poll::Ready(Ok(())) => {
                    let buffer = allocate_buffer();
                    *this.state = StreamState::Reading { buffer, remaining };
                }
            }
        }

        if let StreamState::Reading { buffer, remaining } = this.state {
            let uninit = buffer.spare_capacity_mut();

            // never read past the end of the window: the final read is
            // shortened to whatever remains
            let nbytes = std::cmp::min(
                uninit.len(),
                usize::try_from(*remaining).unwrap_or(usize::MAX),
            );

            let mut read_buf = ReadBuf::uninit(&mut uninit[0..nbytes]);

            match this.body.as_mut().poll_read(cx, &mut read_buf) {
                Poll::Pending => { return Poll::Pending; }
                Poll::Ready(Err(e)) => { return Poll::Ready(Some(Err(e))); }
                Poll::Ready(Ok(())) => {
                    match read_buf.filled().len() {
                        0 => { return Poll::Ready(None); }
                        n => {
                            // SAFETY: poll_read filled `n` additional bytes
                            // beyond buffer.len(), which is always 0 here
                            unsafe { buffer.set_len(buffer.len() + n); }

                            // hand the filled buffer out, leave a fresh one
                            // in its place for the next poll
                            let chunk = mem::replace(buffer, allocate_buffer());

                            // n <= remaining is guaranteed by the cmp::min
                            // above, so this cannot underflow
                            *remaining -= u64::try_from(n).unwrap();

                            return Poll::Ready(Some(Ok(chunk.freeze())));
                        }
                    }
                }
            }
        }

        unreachable!();
    }
}

fn allocate_buffer() -> BytesMut {
    BytesMut::with_capacity(CHUNK_SIZE)
}

#[cfg(test)]
mod tests {
    use futures::{pin_mut, StreamExt};

    use super::RangeStream;
    use crate::file::VideoFile;

    #[tokio::test]
    async fn emits_exactly_the_requested_window() {
        let file = VideoFile::open("test/fixture.mp4").await.unwrap();
        let stream = RangeStream::new(file, 10, 26);

        let mut collected = Vec::new();
        pin_mut!(stream);
        while let Some(chunk) = stream.next().await.transpose().unwrap() {
            collected.extend_from_slice(&chunk);
        }

        assert_eq!(b"ABCDEFGHIJKLMNOPQRSTUVWXYZ".as_slice(), &collected);
    }

    #[tokio::test]
    async fn stream_ends_after_window() {
        // fixture is smaller than CHUNK_SIZE, so a whole-file window
        // arrives as a single chunk followed by end-of-stream
        let file = VideoFile::open("test/fixture.mp4").await.unwrap();
        let stream = RangeStream::new(file, 0, 62);

        pin_mut!(stream);
        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(62, first.len());
        assert!(stream.next().await.is_none());
    }
}
