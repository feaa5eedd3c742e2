use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

use avrd_core::AvrError;

use crate::debounce::{Debouncer, QUIET_WINDOW};
use crate::decoder::FrameStream;

/// Port of the receiver's raw status stream.
pub const STREAM_PORT: u16 = 4545;

pub fn stream_addr(host: &str) -> String {
    format!("{host}:{STREAM_PORT}")
}

/// Live subscription to the status stream; dropping it does not stop the
/// reader, call [`StreamSubscription::cancel`] to tear down.
#[derive(Debug)]
pub struct StreamSubscription {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StreamSubscription {
    /// Stop reading and suppress any frame still waiting out its quiet
    /// window. No frame reaches the handler after this returns.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn stopped(self) {
        let _ = self.task.await;
    }
}

/// Open the status stream at `addr` and deliver debounced frames to
/// `handler`.
///
/// The stream endpoint speaks pre-HTTP/1.0: a bare request line, then raw
/// bytes with no response header. Setup is acknowledged by the first bytes
/// arriving; a connection that closes or errors before any byte is a setup
/// failure. After acknowledgement, decoded frames pass through a
/// 50 millisecond quiet window so bursts collapse to their newest frame.
/// Decode errors are logged and skipped without disturbing later frames.
pub async fn subscribe(
    addr: &str,
    handler: impl Fn(Value) + Send + 'static,
) -> Result<StreamSubscription, AvrError> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| AvrError::SubscriptionSetup(format!("connect {addr}: {e}")))?;

    stream
        .write_all(b"GET /\r\n")
        .await
        .map_err(|e| AvrError::SubscriptionSetup(format!("request: {e}")))?;

    // First read doubles as the setup acknowledgement.
    let mut first = vec![0u8; 8 * 1024];
    let n = stream
        .read(&mut first)
        .await
        .map_err(|e| AvrError::SubscriptionSetup(format!("ack read: {e}")))?;
    if n == 0 {
        return Err(AvrError::SubscriptionSetup(
            "stream closed before acknowledgement".into(),
        ));
    }
    first.truncate(n);
    tracing::info!(addr, ack_bytes = n, "status stream subscribed");

    let mut frames = FrameStream::new(ReaderStream::new(stream));
    frames.feed_initial(&first);

    let cancel = CancellationToken::new();
    let task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            let debouncer = Debouncer::spawn(QUIET_WINDOW, handler);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debouncer.shutdown();
                        return;
                    }
                    frame = frames.next() => match frame {
                        Some(Ok(frame)) => debouncer.push(frame),
                        Some(Err(e)) => {
                            tracing::warn!(reason = %e.reason, "skipping undecodable frame");
                        }
                        None => {
                            tracing::info!("status stream ended");
                            debouncer.shutdown();
                            return;
                        }
                    },
                }
            }
        })
    };

    Ok(StreamSubscription { cancel, task })
}
