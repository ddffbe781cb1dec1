//! Response body capture.
//!
//! # Responsibilities
//! - Forward every body frame to the client unchanged
//! - Mirror data frames into an in-memory buffer, in order
//! - Hand the captured bytes over once the body is finished
//!
//! # Design Decisions
//! - No size cap here; size limits belong to the log storer
//! - The capture completes when the stream ends or the body is dropped,
//!   so an aborted response still yields what was sent

use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};
use pin_project_lite::pin_project;
use tokio::sync::oneshot;

/// Accessor for the bytes recorded by a [`CaptureBody`].
#[derive(Debug)]
pub struct Captured {
    rx: oneshot::Receiver<Bytes>,
}

impl Captured {
    /// Wait until the body has finished and return everything it carried.
    pub async fn bytes(self) -> Bytes {
        self.rx.await.unwrap_or_default()
    }
}

#[derive(Debug)]
struct Recorder {
    buf: BytesMut,
    tx: Option<oneshot::Sender<Bytes>>,
}

impl Recorder {
    fn finish(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(std::mem::take(&mut self.buf).freeze());
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.finish();
    }
}

pin_project! {
    /// Body decorator that records data frames while forwarding them.
    #[derive(Debug)]
    pub struct CaptureBody<B> {
        #[pin]
        inner: B,
        recorder: Recorder,
    }
}

impl<B> CaptureBody<B> {
    /// Wrap `inner`, returning the decorated body and its capture accessor.
    pub fn new(inner: B) -> (Self, Captured) {
        let (tx, rx) = oneshot::channel();
        let body = Self {
            inner,
            recorder: Recorder {
                buf: BytesMut::new(),
                tx: Some(tx),
            },
        };
        (body, Captured { rx })
    }
}

impl<B> Body for CaptureBody<B>
where
    B: Body<Data = Bytes>,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.project();

        match ready!(this.inner.poll_frame(cx)) {
            Some(Ok(frame)) => {
                if let Some(data) = frame.data_ref() {
                    this.recorder.buf.extend_from_slice(data);
                }
                Poll::Ready(Some(Ok(frame)))
            }
            Some(Err(e)) => Poll::Ready(Some(Err(e))),
            None => {
                this.recorder.finish();
                Poll::Ready(None)
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}
