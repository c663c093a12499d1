//! Outgoing request bodies.
//!
//! A [`TransportBody`] always knows its exact length up front so hyper can
//! send a `content-length` header. Payloads are either handed over in one
//! frame or, when upload progress is wanted, sliced into
//! [`UPLOAD_CHUNK_SIZE`] frames that report as they are polled.

use std::convert::Infallible;
use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use api_zero_core::{Progress, ProgressCallback};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;

/// Frame size for metered uploads.
pub const UPLOAD_CHUNK_SIZE: usize = 16 * 1024;

type ChunkStream = Pin<Box<dyn Stream<Item = Bytes> + Send>>;

pin_project! {
    /// Body type the transport hands to hyper.
    pub struct TransportBody {
        #[pin]
        source: Source,
        remaining: u64,
    }
}

pin_project! {
    #[project = SourceProj]
    enum Source {
        Buffered { data: Option<Bytes> },
        Metered { #[pin] chunks: ChunkStream },
    }
}

impl TransportBody {
    pub fn empty() -> Self {
        Self {
            source: Source::Buffered { data: None },
            remaining: 0,
        }
    }

    /// The whole payload as a single frame.
    pub fn full(data: Bytes) -> Self {
        let remaining = data.len() as u64;
        let data = (!data.is_empty()).then_some(data);
        Self {
            source: Source::Buffered { data },
            remaining,
        }
    }

    /// The payload in [`UPLOAD_CHUNK_SIZE`] frames. After each frame is
    /// produced, `on_progress` receives the running total against the full
    /// length. An empty payload produces no frames and no callbacks.
    pub fn metered(data: Bytes, on_progress: ProgressCallback) -> Self {
        let total = data.len() as u64;
        let slices: Vec<Bytes> = (0..data.len())
            .step_by(UPLOAD_CHUNK_SIZE)
            .map(|start| data.slice(start..data.len().min(start + UPLOAD_CHUNK_SIZE)))
            .collect();

        let mut sent = 0u64;
        let chunks = futures::stream::iter(slices).inspect(move |chunk| {
            sent += chunk.len() as u64;
            on_progress(Progress::new(sent, Some(total)));
        });

        Self {
            source: Source::Metered {
                chunks: Box::pin(chunks),
            },
            remaining: total,
        }
    }
}

impl Default for TransportBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl Body for TransportBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Bytes>, Infallible>>> {
        let this = self.project();
        let next = match this.source.project() {
            SourceProj::Buffered { data } => data.take(),
            SourceProj::Metered { chunks } => match chunks.poll_next(cx) {
                Poll::Ready(next) => next,
                Poll::Pending => return Poll::Pending,
            },
        };
        if let Some(chunk) = &next {
            *this.remaining = this.remaining.saturating_sub(chunk.len() as u64);
        }
        Poll::Ready(next.map(|chunk| Ok(Frame::data(chunk))))
    }

    fn is_end_stream(&self) -> bool {
        self.remaining == 0
    }

    fn size_hint(&self) -> SizeHint {
        SizeHint::with_exact(self.remaining)
    }
}

impl fmt::Debug for TransportBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.source {
            Source::Buffered { .. } => "buffered",
            Source::Metered { .. } => "metered",
        };
        f.debug_struct("TransportBody")
            .field("source", &source)
            .field("remaining", &self.remaining)
            .finish()
    }
}
