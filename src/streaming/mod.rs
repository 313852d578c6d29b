//! Upstream body relay
//!
//! Wraps the upstream byte stream so each chunk is handed to the client as soon
//! as it arrives. Nothing is buffered: hyper pulls the next chunk only once the
//! previous one has been written, so a slow client slows the upstream read.
//! Dropping the relay (e.g. on client disconnect) drops the upstream body and
//! with it the upstream connection.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tracing::{debug, warn};

use crate::proxy::target::Action;

/// Stream type for upstream response bodies
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// Chunk-by-chunk passthrough of an upstream body
pub struct RelayStream {
    inner: ByteStream,
    model: String,
    action: Action,
    chunks: usize,
    bytes: usize,
    finished: bool,
}

impl RelayStream {
    pub fn new(inner: ByteStream, model: impl Into<String>, action: Action) -> Self {
        Self {
            inner,
            model: model.into(),
            action,
            chunks: 0,
            bytes: 0,
            finished: false,
        }
    }

    /// Number of chunks relayed so far
    pub fn chunks(&self) -> usize {
        self.chunks
    }

    /// Number of bytes relayed so far
    pub fn bytes(&self) -> usize {
        self.bytes
    }
}

impl Stream for RelayStream {
    type Item = Result<Bytes, reqwest::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.chunks += 1;
                this.bytes += chunk.len();
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(Some(Err(e))) => {
                // The request URL carries the API key
                let e = e.without_url();
                warn!(
                    model = %this.model,
                    action = %this.action,
                    error = %e,
                    "Upstream body failed mid-relay"
                );
                this.finished = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.finished = true;
                debug!(
                    model = %this.model,
                    action = %this.action,
                    chunks = this.chunks,
                    bytes = this.bytes,
                    "Upstream body relayed"
                );
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl Drop for RelayStream {
    fn drop(&mut self) {
        if !self.finished {
            debug!(
                model = %self.model,
                action = %self.action,
                chunks = self.chunks,
                bytes = self.bytes,
                "Client went away before upstream finished, closing upstream connection"
            );
        }
    }
}
