use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use avrd_core::AvrError;

use crate::ops::Avr;

/// Pause after a successful query before the next one.
pub const POLL_DELAY: Duration = Duration::from_millis(10);
/// Pause after a failed query before the next one.
pub const POLL_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Clone, Copy)]
enum PollStep {
    Power,
    Volume,
    Input,
    DimmerLevel,
    ListeningMode,
}

impl PollStep {
    const CYCLE: [PollStep; 5] = [
        Self::Power,
        Self::Volume,
        Self::Input,
        Self::DimmerLevel,
        Self::ListeningMode,
    ];

    fn name(self) -> &'static str {
        match self {
            Self::Power => "power",
            Self::Volume => "volume",
            Self::Input => "input",
            Self::DimmerLevel => "dimmer-level",
            Self::ListeningMode => "listening-mode",
        }
    }

    async fn run(self, avr: &Avr) -> Result<(), AvrError> {
        match self {
            Self::Power => avr.power().await.map(drop),
            Self::Volume => avr.volume().await.map(drop),
            Self::Input => avr.input().await.map(drop),
            Self::DimmerLevel => avr.dimmer_level().await.map(drop),
            Self::ListeningMode => avr.listening_mode().await.map(drop),
        }
    }
}

/// Start the background refresh loop that keeps the status cache warm.
///
/// Queries cycle through the tracked properties in a fixed order. A failed
/// query is logged and answered with a longer pause, then the loop moves on
/// to the NEXT property; one flaky query never stalls the rest of the cycle
/// and the loop never exits on error. Only the cancellation token stops it.
pub fn spawn_poller(avr: Arc<Avr>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            for step in PollStep::CYCLE {
                let delay = match step.run(&avr).await {
                    Ok(()) => POLL_DELAY,
                    Err(e) => {
                        tracing::warn!(
                            property = step.name(),
                            error = %e,
                            kind = e.error_kind(),
                            "status refresh failed"
                        );
                        POLL_BACKOFF
                    }
                };

                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("poller stopped");
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::StatusCache;
    use crate::mock::MockReceiver;
    use crate::session::CommandTransport;

    fn poller_fixture() -> (Arc<MockReceiver>, Arc<Avr>) {
        let mock = Arc::new(MockReceiver::new());
        let avr = Arc::new(Avr::new(
            Arc::clone(&mock) as Arc<dyn CommandTransport>,
            mock.bus().clone(),
            Arc::new(StatusCache::new()),
        ));
        (mock, avr)
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_cycles_fill_the_cache() {
        let (mock, avr) = poller_fixture();
        mock.set_volume_state(73);

        let cancel = CancellationToken::new();
        let task = spawn_poller(Arc::clone(&avr), cancel.clone());

        tokio::time::sleep(POLL_DELAY * 20).await;
        cancel.cancel();
        task.await.unwrap();

        let snap = avr.cache().snapshot();
        assert_eq!(snap.volume, Some(73));
        assert!(snap.power.is_some());
        assert!(snap.input.is_some());
        assert!(snap.listening_mode.is_some());
        assert!(snap.dimmer_level.is_some());
        // Five queries per cycle; several cycles ran.
        assert!(mock.send_count() >= 10, "sent {}", mock.send_count());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_query_backs_off_then_moves_to_the_next_property() {
        let (mock, avr) = poller_fixture();
        mock.fail_once("volume");

        let cancel = CancellationToken::new();
        let task = spawn_poller(Arc::clone(&avr), cancel.clone());

        // Power succeeds, volume fails and starts the backoff; the input
        // query must not have run yet.
        tokio::time::sleep(POLL_BACKOFF / 2).await;
        let snap = avr.cache().snapshot();
        assert!(snap.power.is_some());
        assert!(snap.volume.is_none());
        assert!(snap.input.is_none());

        // After the backoff the loop continues with input, not a restart.
        tokio::time::sleep(POLL_BACKOFF).await;
        let snap = avr.cache().snapshot();
        assert!(snap.input.is_some());
        assert!(snap.dimmer_level.is_some());

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_stops_the_loop() {
        let (mock, avr) = poller_fixture();

        let cancel = CancellationToken::new();
        let task = spawn_poller(avr, cancel.clone());

        tokio::time::sleep(POLL_DELAY * 2).await;
        cancel.cancel();
        task.await.unwrap();

        let sends = mock.send_count();
        tokio::time::sleep(POLL_BACKOFF * 2).await;
        assert_eq!(mock.send_count(), sends, "no sends after cancellation");
    }
}
