//! Cancellation-aware body draining.
//!
//! `tokio::io::copy` into a sink would drain a body just as well, but it
//! cannot be interrupted between chunks. A server that streams forever would
//! then pin a worker indefinitely, so the loop here races every read against
//! the request deadline.

use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};

use super::deadline::{Interrupt, RequestDeadline};

/// Why draining stopped before end of stream.
///
/// Both variants carry the number of bytes read before the failure.
#[derive(Debug, Error)]
pub enum CountError {
    /// The deadline fired.
    #[error("{reason} after {bytes} bytes")]
    Interrupted { bytes: u64, reason: Interrupt },

    /// The stream reported an error.
    #[error("failed to read body after {bytes} bytes: {source}")]
    Read {
        bytes: u64,
        #[source]
        source: io::Error,
    },
}

impl CountError {
    /// Bytes counted before the failure.
    pub fn bytes(&self) -> u64 {
        match self {
            CountError::Interrupted { bytes, .. } | CountError::Read { bytes, .. } => *bytes,
        }
    }
}

/// Read `reader` to end of stream in chunks of `buffer_size` bytes and return
/// the total number of bytes read.
///
/// The deadline is checked before every read, so a deadline that has already
/// fired returns without touching the reader.
pub async fn count_bytes<R>(
    reader: &mut R,
    buffer_size: usize,
    deadline: &RequestDeadline,
) -> Result<u64, CountError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total: u64 = 0;

    loop {
        if let Some(reason) = deadline.check() {
            return Err(CountError::Interrupted {
                bytes: total,
                reason,
            });
        }

        let read = tokio::select! {
            biased;
            reason = deadline.fired() => {
                return Err(CountError::Interrupted { bytes: total, reason });
            }
            read = reader.read(&mut buffer) => read,
        };

        match read {
            Ok(0) => return Ok(total),
            Ok(n) => total += n as u64,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(source) => {
                return Err(CountError::Read {
                    bytes: total,
                    source,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use proptest::prelude::*;
    use tokio::io::{AsyncWriteExt, ReadBuf};
    use tokio_util::sync::CancellationToken;

    fn deadline(timeout: Duration) -> (CancellationToken, RequestDeadline) {
        let lifetime = CancellationToken::new();
        let deadline = RequestDeadline::new(&lifetime, timeout);
        (lifetime, deadline)
    }

    /// Reader that records how many times it was polled.
    struct PollCounter {
        polls: Arc<AtomicUsize>,
    }

    impl AsyncRead for PollCounter {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            self.polls.fetch_add(1, Ordering::SeqCst);
            buf.put_slice(b"data");
            Poll::Ready(Ok(()))
        }
    }

    /// Reader that always fails.
    struct Broken;

    impl AsyncRead for Broken {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            )))
        }
    }

    #[tokio::test]
    async fn test_counts_full_stream() {
        let (_lifetime, deadline) = deadline(Duration::from_secs(5));
        let mut body: &[u8] = b"This is the response body";

        let total = count_bytes(&mut body, 32 * 1024, &deadline).await.unwrap();
        assert_eq!(total, 25);
    }

    #[tokio::test]
    async fn test_counts_final_short_chunk() {
        let (_lifetime, deadline) = deadline(Duration::from_secs(5));
        let data = vec![7u8; 100];
        let mut body: &[u8] = &data;

        // 100 bytes through a 7-byte buffer ends with a 2-byte read.
        let total = count_bytes(&mut body, 7, &deadline).await.unwrap();
        assert_eq!(total, 100);
    }

    #[tokio::test]
    async fn test_empty_stream_counts_zero() {
        let (_lifetime, deadline) = deadline(Duration::from_secs(5));
        let mut body: &[u8] = b"";

        assert_eq!(count_bytes(&mut body, 16, &deadline).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_zero_buffer_size_still_progresses() {
        let (_lifetime, deadline) = deadline(Duration::from_secs(5));
        let mut body: &[u8] = b"abc";

        assert_eq!(count_bytes(&mut body, 0, &deadline).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_cancelled_before_first_read_performs_no_read() {
        let (lifetime, deadline) = deadline(Duration::from_secs(5));
        lifetime.cancel();

        let polls = Arc::new(AtomicUsize::new(0));
        let mut reader = PollCounter {
            polls: Arc::clone(&polls),
        };

        let err = count_bytes(&mut reader, 16, &deadline).await.unwrap_err();
        assert!(matches!(
            err,
            CountError::Interrupted {
                bytes: 0,
                reason: Interrupt::Cancelled
            }
        ));
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_endless_stream_stops_at_deadline() {
        let (_lifetime, deadline) = deadline(Duration::from_millis(200));
        let (mut client, mut server) = tokio::io::duplex(64);

        // Server sends some bytes and then stalls without closing.
        server.write_all(b"0123456789").await.unwrap();

        let err = count_bytes(&mut client, 4, &deadline).await.unwrap_err();
        assert!(matches!(
            err,
            CountError::Interrupted {
                reason: Interrupt::TimedOut,
                ..
            }
        ));
        assert_eq!(err.bytes(), 10);
        drop(server);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifetime_cancel_interrupts_blocked_read() {
        let (lifetime, deadline) = deadline(Duration::from_secs(60));
        let (mut client, _server) = tokio::io::duplex(64);

        let canceller = lifetime.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            canceller.cancel();
        });

        let err = count_bytes(&mut client, 16, &deadline).await.unwrap_err();
        assert!(matches!(
            err,
            CountError::Interrupted {
                bytes: 0,
                reason: Interrupt::Cancelled
            }
        ));
    }

    #[tokio::test]
    async fn test_read_error_keeps_partial_count() {
        let (_lifetime, deadline) = deadline(Duration::from_secs(5));
        let mut reader = (&b"abcd"[..]).chain(Broken);

        let err = count_bytes(&mut reader, 16, &deadline).await.unwrap_err();
        assert!(matches!(err, CountError::Read { bytes: 4, .. }));
        assert!(err.to_string().contains("connection reset"));
    }

    proptest! {
        #[test]
        fn prop_counts_every_byte(len in 0usize..4096, buffer_size in 1usize..512) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap();
            let data = vec![0xAB; len];

            let total = runtime.block_on(async {
                let (_lifetime, deadline) = deadline(Duration::from_secs(5));
                let mut body: &[u8] = &data;
                count_bytes(&mut body, buffer_size, &deadline).await
            });

            prop_assert_eq!(total.unwrap(), len as u64);
        }
    }
}
