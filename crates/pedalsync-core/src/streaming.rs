//! Ordered stream of sensor readings from a transport subscription.
//!
//! A transport hands out a [`ReadingStream`] from
//! [`SensorTransport::subscribe`](crate::SensorTransport::subscribe). The
//! stream has a single reader and preserves arrival order. Closing or
//! dropping it cancels the producer through a cancellation token.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pedalsync_types::SessionReading;

/// Default channel capacity between a transport and its stream.
pub const DEFAULT_STREAM_BUFFER: usize = 16;

/// A stream of readings delivered by a sensor transport.
pub struct ReadingStream {
    receiver: mpsc::Receiver<SessionReading>,
    cancel_token: CancellationToken,
}

impl std::fmt::Debug for ReadingStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadingStream")
            .field("cancelled", &self.cancel_token.is_cancelled())
            .finish()
    }
}

impl ReadingStream {
    /// Wrap a receiver whose producer watches `cancel_token`.
    pub fn new(receiver: mpsc::Receiver<SessionReading>, cancel_token: CancellationToken) -> Self {
        Self {
            receiver,
            cancel_token,
        }
    }

    /// Create a stream fed directly by the returned sender.
    ///
    /// Useful for transports that already receive readings on a callback,
    /// and for tests that script readings by hand.
    ///
    /// ```
    /// use futures::StreamExt;
    /// use pedalsync_core::ReadingStream;
    /// use pedalsync_types::SessionReading;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let (tx, mut stream) = ReadingStream::channel(4);
    /// tx.send(SessionReading::new(12.0, 0.1, 20)).await.unwrap();
    /// drop(tx);
    /// assert_eq!(stream.next().await.unwrap().cycles, 20);
    /// assert!(stream.next().await.is_none());
    /// # }
    /// ```
    pub fn channel(buffer: usize) -> (mpsc::Sender<SessionReading>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self::new(rx, CancellationToken::new()))
    }

    /// Receive the next reading, or `None` once the producer is gone.
    pub async fn recv(&mut self) -> Option<SessionReading> {
        self.receiver.recv().await
    }

    /// Close the stream and stop the producer.
    pub fn close(self) {
        self.cancel_token.cancel();
    }

    /// Token cancelled when this stream is closed or dropped.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Check if the stream has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

impl Drop for ReadingStream {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl Stream for ReadingStream {
    type Item = SessionReading;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.receiver).poll_recv(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_channel_preserves_order() {
        let (tx, mut stream) = ReadingStream::channel(8);
        for cycles in 1..=5 {
            tx.send(SessionReading::new(10.0, 0.0, cycles)).await.unwrap();
        }
        drop(tx);

        let received: Vec<u64> = stream.by_ref().map(|r| r.cycles).collect().await;
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_drop_cancels_token() {
        let (_tx, stream) = ReadingStream::channel(1);
        let token = stream.cancellation_token();
        assert!(!token.is_cancelled());
        drop(stream);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_close_cancels_token() {
        let (_tx, stream) = ReadingStream::channel(1);
        let token = stream.cancellation_token();
        stream.close();
        assert!(token.is_cancelled());
    }
}
