//! Bounded token relay between the runtime callback and the UI.
//!
//! One relay exists per generation and is never shared or reused across
//! generations: the producer half goes to that generation's callback
//! adapter, the consumer half to the UI loop. Every fragment carries the
//! generation id it belongs to; the consumer must discard fragments whose
//! id does not match the currently active generation.
//!
//! On cancellation the coordinator swaps in a fresh relay and retires the
//! old receiver into a drain task, so a producer that is still briefly
//! alive never blocks on a full buffer and none of its fragments are
//! delivered after the swap.

use tokio::sync::mpsc;

use culina_types::llm::GenerationId;

/// A token fragment flowing from the runtime to the UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamFragment {
    pub generation_id: GenerationId,
    pub text: String,
}

/// Create the relay for one generation.
///
/// The buffer is bounded so a slow consumer exerts backpressure on the
/// producer instead of growing memory without limit.
pub fn channel(capacity: usize, generation_id: GenerationId) -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        RelaySender { generation_id, tx },
        RelayReceiver { rx },
    )
}

/// Producer half of a relay, tagged with its generation id.
#[derive(Debug, Clone)]
pub struct RelaySender {
    generation_id: GenerationId,
    tx: mpsc::Sender<StreamFragment>,
}

impl RelaySender {
    pub fn generation_id(&self) -> GenerationId {
        self.generation_id
    }

    /// Send a fragment, waiting when the buffer is full.
    ///
    /// Returns false when the receiver is gone (the generation was
    /// retired); the producer should simply stop forwarding.
    pub async fn send(&self, text: String) -> bool {
        self.tx
            .send(StreamFragment {
                generation_id: self.generation_id,
                text,
            })
            .await
            .is_ok()
    }
}

/// Consumer half of a relay.
#[derive(Debug)]
pub struct RelayReceiver {
    rx: mpsc::Receiver<StreamFragment>,
}

impl RelayReceiver {
    /// Receive the next fragment; `None` once the producer is dropped and
    /// the buffer is drained.
    pub async fn recv(&mut self) -> Option<StreamFragment> {
        self.rx.recv().await
    }

    /// A receiver whose producer is already gone. Placeholder for the
    /// coordinator's idle state.
    pub fn closed() -> Self {
        let (_, rx) = mpsc::channel(1);
        Self { rx }
    }

    /// Retire this receiver: read it to exhaustion in a background task,
    /// discarding every fragment, then drop it. Guarantees the producer of
    /// a cancelled generation never blocks forever on a full buffer.
    pub fn retire(mut self) {
        tokio::spawn(async move {
            let mut drained = 0usize;
            while self.rx.recv().await.is_some() {
                drained += 1;
            }
            if drained > 0 {
                tracing::debug!(drained, "drained retired stream relay");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    #[tokio::test]
    async fn test_fragments_carry_generation_id() {
        let (tx, mut rx) = channel(8, 42);
        assert!(tx.send("hello".to_string()).await);

        let fragment = rx.recv().await.unwrap();
        assert_eq!(fragment.generation_id, 42);
        assert_eq!(fragment.text, "hello");
    }

    #[tokio::test]
    async fn test_send_fails_after_receiver_dropped() {
        let (tx, rx) = channel(8, 1);
        drop(rx);
        assert!(!tx.send("late".to_string()).await);
    }

    #[tokio::test]
    async fn test_recv_none_after_sender_dropped() {
        let (tx, mut rx) = channel(8, 1);
        assert!(tx.send("only".to_string()).await);
        drop(tx);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_full_buffer_blocks_until_consumed() {
        let (tx, mut rx) = channel(1, 1);
        assert!(tx.send("a".to_string()).await);

        // The buffer is full; a second send must not complete yet.
        let pending = tokio::time::timeout(Duration::from_millis(50), tx.send("b".to_string()));
        assert!(pending.await.is_err());

        // Consuming frees a slot.
        assert_eq!(rx.recv().await.unwrap().text, "a");
        assert!(tx.send("b".to_string()).await);
    }

    #[tokio::test]
    async fn test_retire_unblocks_producer_on_full_buffer() {
        let (tx, rx) = channel(1, 1);
        assert!(tx.send("a".to_string()).await);

        rx.retire();

        // The drain task empties the buffer, so further sends complete
        // (until the drained receiver is dropped entirely).
        let sent = tokio::time::timeout(Duration::from_secs(1), tx.send("b".to_string()))
            .await
            .expect("send must not block after retire");
        // Either outcome is fine -- delivered to the drain or rejected
        // because the drain already finished -- as long as it returned.
        let _ = sent;
    }

    #[tokio::test]
    async fn test_closed_receiver_yields_none() {
        let mut rx = RelayReceiver::closed();
        assert!(rx.recv().await.is_none());
    }
}
