use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::oneshot;

/// One-shot settlement cell: a result slot that can be written exactly once.
///
/// Two outcomes race for every correlation (the matching device event vs. a
/// transport-level send failure); whichever settles first wins and every
/// later attempt is a no-op. The awaiting side holds the paired receiver.
pub struct SettleCell<T> {
    tx: Mutex<Option<oneshot::Sender<T>>>,
}

impl<T> SettleCell<T> {
    /// Create a cell and the receiver that observes its single value.
    pub fn channel() -> (Arc<Self>, oneshot::Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Arc::new(Self { tx: Mutex::new(Some(tx)) }), rx)
    }

    /// Write the value if the cell is still open. Returns true when this
    /// call settled the cell, false when a previous call already did.
    pub fn settle(&self, value: T) -> bool {
        match self.tx.lock().take() {
            // The receiver may already be gone; the settle still counts.
            Some(tx) => {
                let _ = tx.send(value);
                true
            }
            None => false,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.tx.lock().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_settle_wins() {
        let (cell, rx) = SettleCell::channel();
        assert!(!cell.is_settled());

        assert!(cell.settle(1));
        assert!(!cell.settle(2));
        assert!(cell.is_settled());

        assert_eq!(rx.await.unwrap(), 1);
    }

    #[tokio::test]
    async fn settle_after_receiver_dropped_is_counted() {
        let (cell, rx) = SettleCell::<u32>::channel();
        drop(rx);

        assert!(cell.settle(7));
        assert!(!cell.settle(8));
    }

    #[tokio::test]
    async fn concurrent_settles_produce_one_value() {
        let (cell, rx) = SettleCell::channel();

        let mut handles = Vec::new();
        for i in 0..8u32 {
            let cell = Arc::clone(&cell);
            handles.push(tokio::spawn(async move { cell.settle(i) }));
        }

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(rx.await.is_ok());
    }
}
