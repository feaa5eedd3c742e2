use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use avrd_core::{AvrError, SettleCell};

use crate::bus::EventBus;
use crate::session::CommandTransport;

/// Send a fire-and-forget command and resolve it against the asynchronous
/// event that answers it.
///
/// A one-shot listener for `response_event` is registered before the send,
/// then two outcomes race: the transport rejecting the send, or the listener
/// firing with a payload. A settlement cell guarantees only the first one
/// counts; the loser is a no-op.
///
/// The reference hardware never fails to answer an accepted command, so
/// there is no default deadline; pass `timeout` to bound the wait anyway.
/// Expiry settles `AvrError::Timeout` and detaches the listener.
pub async fn issue_and_await(
    transport: &dyn CommandTransport,
    bus: &EventBus,
    command: &str,
    response_event: &str,
    timeout: Option<Duration>,
) -> Result<Value, AvrError> {
    let (cell, mut rx) = SettleCell::<Result<Value, AvrError>>::channel();

    let listener = {
        let cell = Arc::clone(&cell);
        bus.subscribe_once(response_event, move |payload| {
            cell.settle(Ok(payload));
        })
    };

    if let Err(e) = transport.send(command).await {
        tracing::debug!(command, error = %e, "command send rejected");
        // If the event already settled, the failure loses the race.
        cell.settle(Err(e));
    }

    let outcome = match timeout {
        None => rx.await,
        Some(limit) => match tokio::time::timeout(limit, &mut rx).await {
            Ok(outcome) => outcome,
            Err(_) => {
                cell.settle(Err(AvrError::Timeout(limit)));
                // The cell is settled now either way; the value is in flight.
                rx.await
            }
        },
    };

    // Idempotent: a fired one-shot has already removed itself.
    listener.unsubscribe();

    match outcome {
        Ok(result) => result,
        Err(_) => Err(AvrError::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockReceiver;
    use avrd_core::events::names;
    use async_trait::async_trait;
    use serde_json::json;

    /// Transport that rejects every send.
    struct DeadTransport;

    #[async_trait]
    impl CommandTransport for DeadTransport {
        async fn send(&self, _command: &str) -> Result<(), AvrError> {
            Err(AvrError::Transport("send failed".into()))
        }
    }

    /// Transport that publishes an answer and THEN reports the send failed,
    /// exercising the race where both outcomes occur.
    struct AnswerThenFail {
        bus: EventBus,
    }

    #[async_trait]
    impl CommandTransport for AnswerThenFail {
        async fn send(&self, _command: &str) -> Result<(), AvrError> {
            self.bus.publish(names::VOLUME, json!(12));
            Err(AvrError::Transport("late failure".into()))
        }
    }

    #[tokio::test]
    async fn matching_event_resolves_with_payload() {
        let mock = MockReceiver::new();
        mock.set_volume_state(37);

        let value = issue_and_await(&mock, mock.bus(), "volume query", names::VOLUME, None)
            .await
            .unwrap();
        assert_eq!(value, json!(37));
    }

    #[tokio::test]
    async fn send_failure_rejects_with_transport() {
        let bus = EventBus::new();
        let err = issue_and_await(&DeadTransport, &bus, "volume query", names::VOLUME, None)
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "transport");
        // The one-shot listener was detached on the failure path.
        assert_eq!(bus.handler_count(names::VOLUME), 0);
    }

    #[tokio::test]
    async fn event_beats_late_send_failure() {
        let bus = EventBus::new();
        let transport = AnswerThenFail { bus: bus.clone() };

        let value = issue_and_await(&transport, &bus, "volume query", names::VOLUME, None)
            .await
            .unwrap();
        assert_eq!(value, json!(12), "first settlement wins; the failure is a no-op");
    }

    #[tokio::test]
    async fn late_event_after_failure_has_no_effect() {
        let bus = EventBus::new();
        let err = issue_and_await(&DeadTransport, &bus, "volume query", names::VOLUME, None)
            .await
            .unwrap_err();
        assert_eq!(err.error_kind(), "transport");

        // The answer arriving after settlement reaches nobody.
        bus.publish(names::VOLUME, json!(99));
        assert_eq!(bus.handler_count(names::VOLUME), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn optional_timeout_expires_and_detaches() {
        let mock = MockReceiver::new();
        mock.mute_answers(true);

        let err = issue_and_await(
            &mock,
            mock.bus(),
            "volume query",
            names::VOLUME,
            Some(Duration::from_secs(5)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AvrError::Timeout(_)));
        assert_eq!(mock.bus().handler_count(names::VOLUME), 0);
    }

    #[tokio::test]
    async fn no_timeout_waits_for_the_event() {
        let bus = EventBus::new();
        let mock = MockReceiver::with_bus(bus.clone());
        mock.mute_answers(true);

        let publisher = {
            let bus = bus.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                bus.publish(names::VOLUME, json!(64));
            })
        };

        let value = issue_and_await(&mock, &bus, "volume query", names::VOLUME, None)
            .await
            .unwrap();
        assert_eq!(value, json!(64));
        publisher.await.unwrap();
    }
}
