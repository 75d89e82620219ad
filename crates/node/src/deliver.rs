//! Hands block updates to the execution engines.

use std::sync::Arc;

use alloy_rpc_types_engine::ForkchoiceState;
use elrelay_execution::EngineApi;
use elrelay_types::{BlockUpdate, aliases::B256};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Head and finalized hashes last sent to the engines.
///
/// Both start at zero. Folding updates in any interleaving of the two streams
/// ends with the latest head and the latest finalized hash.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliverState {
    pub last_head: B256,
    pub last_finalized: B256,
}

impl DeliverState {
    pub fn on_head(&mut self, hash: B256) -> ForkchoiceState {
        self.last_head = hash;
        self.forkchoice()
    }

    /// A finalized block seen before any head also becomes the head, so that
    /// no forkchoice update ever carries a zero head.
    pub fn on_finalized(&mut self, hash: B256) -> ForkchoiceState {
        self.last_finalized = hash;
        if self.last_head.is_zero() {
            self.last_head = hash;
        }
        self.forkchoice()
    }

    pub fn forkchoice(&self) -> ForkchoiceState {
        ForkchoiceState {
            head_block_hash: self.last_head,
            safe_block_hash: B256::ZERO,
            finalized_block_hash: self.last_finalized,
        }
    }
}

pub(crate) struct DeliverWorker {
    engine: Arc<dyn EngineApi>,
    head_rx: mpsc::Receiver<BlockUpdate>,
    finalized_rx: mpsc::Receiver<BlockUpdate>,
    state: DeliverState,
}

impl DeliverWorker {
    pub(crate) fn new(
        engine: Arc<dyn EngineApi>,
        head_rx: mpsc::Receiver<BlockUpdate>,
        finalized_rx: mpsc::Receiver<BlockUpdate>,
    ) -> Self {
        Self { engine, head_rx, finalized_rx, state: DeliverState::default() }
    }

    pub(crate) async fn run(mut self, shutdown: CancellationToken) {
        info!(el = %self.engine.name(), "Deliver loop started");

        loop {
            // No priority between the channels; the state converges either way.
            tokio::select! {
                _ = shutdown.cancelled() => break,
                update = self.head_rx.recv() => match update {
                    Some(update) => self.deliver_head(update).await,
                    None => break,
                },
                update = self.finalized_rx.recv() => match update {
                    Some(update) => self.deliver_finalized(update).await,
                    None => break,
                },
            }
        }

        info!("Deliver loop stopped");
    }

    async fn deliver_head(&mut self, update: BlockUpdate) {
        let number = update.block_number();
        let forkchoice = self.state.on_head(update.block_hash());
        debug!(number, head = %forkchoice.head_block_hash, "Delivering head");

        let BlockUpdate { payload, parent_beacon_root, versioned_hashes } = update;
        if let Err(e) = self.engine.new_payload(payload, versioned_hashes, parent_beacon_root).await
        {
            debug!(number, err = %e, "New payload not accepted");
        }
        self.update_forkchoice(forkchoice).await;
    }

    async fn deliver_finalized(&mut self, update: BlockUpdate) {
        let forkchoice = self.state.on_finalized(update.block_hash());
        debug!(
            number = update.block_number(),
            finalized = %forkchoice.finalized_block_hash,
            "Delivering finalized"
        );
        self.update_forkchoice(forkchoice).await;
    }

    async fn update_forkchoice(&self, forkchoice: ForkchoiceState) {
        if let Err(e) = self.engine.forkchoice_updated(forkchoice, None).await {
            debug!(head = %forkchoice.head_block_hash, err = %e, "Forkchoice update not accepted");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use elrelay_execution::test_utils::{EngineCall, RecordingEngine};
    use elrelay_types::test_utils::sample_payload;
    use tokio::task::JoinHandle;

    use super::*;

    fn hash(tag: u8) -> B256 {
        B256::repeat_byte(tag)
    }

    fn update(number: u64, tag: u8) -> BlockUpdate {
        BlockUpdate::new(sample_payload(number, hash(tag), vec![]), hash(tag ^ 0xff)).unwrap()
    }

    fn fcu(head: u8, finalized: u8) -> ForkchoiceState {
        let hash_or_zero = |tag: u8| if tag == 0 { B256::ZERO } else { hash(tag) };
        ForkchoiceState {
            head_block_hash: hash_or_zero(head),
            safe_block_hash: B256::ZERO,
            finalized_block_hash: hash_or_zero(finalized),
        }
    }

    #[derive(Debug, Clone, Copy)]
    enum Event {
        Head(u8),
        Finalized(u8),
    }

    /// Every interleaving of `heads` and `finalized` that keeps each stream's order.
    fn interleavings(heads: &[u8], finalized: &[u8]) -> Vec<Vec<Event>> {
        match (heads.split_first(), finalized.split_first()) {
            (None, None) => vec![Vec::new()],
            (Some((h, rest)), None) => prepend(Event::Head(*h), interleavings(rest, &[])),
            (None, Some((f, rest))) => prepend(Event::Finalized(*f), interleavings(&[], rest)),
            (Some((h, h_rest)), Some((f, f_rest))) => {
                let mut all = prepend(Event::Head(*h), interleavings(h_rest, finalized));
                all.extend(prepend(Event::Finalized(*f), interleavings(heads, f_rest)));
                all
            }
        }
    }

    fn prepend(event: Event, tails: Vec<Vec<Event>>) -> Vec<Vec<Event>> {
        tails
            .into_iter()
            .map(|mut tail| {
                tail.insert(0, event);
                tail
            })
            .collect()
    }

    #[test]
    fn converges_under_any_interleaving() {
        let orders = interleavings(&[1, 2, 3], &[10, 11]);
        assert_eq!(orders.len(), 10);

        for order in orders {
            let mut state = DeliverState::default();
            for event in &order {
                match *event {
                    Event::Head(tag) => state.on_head(hash(tag)),
                    Event::Finalized(tag) => state.on_finalized(hash(tag)),
                };
            }
            assert_eq!(
                state,
                DeliverState { last_head: hash(3), last_finalized: hash(11) },
                "order {order:?}"
            );
        }
    }

    #[test]
    fn finalized_before_any_head_seeds_the_head() {
        let mut state = DeliverState::default();
        assert_eq!(state.on_finalized(hash(7)), fcu(7, 7));

        // Later finalized blocks leave a seeded head alone.
        assert_eq!(state.on_finalized(hash(8)), fcu(7, 8));
        assert_eq!(state.on_head(hash(9)), fcu(9, 8));
    }

    #[test]
    fn head_before_finalized_leaves_finalized_zero() {
        let mut state = DeliverState::default();
        assert_eq!(state.on_head(hash(1)), fcu(1, 0));
        assert_eq!(state.on_finalized(hash(2)), fcu(1, 2));
    }

    struct Harness {
        engine: Arc<RecordingEngine>,
        head_tx: mpsc::Sender<BlockUpdate>,
        finalized_tx: mpsc::Sender<BlockUpdate>,
        shutdown: CancellationToken,
        task: JoinHandle<()>,
    }

    impl Harness {
        fn start(engine: RecordingEngine) -> Self {
            let engine = Arc::new(engine);
            let (head_tx, head_rx) = mpsc::channel(10);
            let (finalized_tx, finalized_rx) = mpsc::channel(10);
            let worker = DeliverWorker::new(engine.clone(), head_rx, finalized_rx);
            let shutdown = CancellationToken::new();
            let task = tokio::spawn(worker.run(shutdown.clone()));
            Self { engine, head_tx, finalized_tx, shutdown, task }
        }

        async fn wait_for_calls(&self, count: usize) {
            for _ in 0..100 {
                if self.engine.calls().len() >= count {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
            panic!("expected {count} calls, got {:?}", self.engine.calls());
        }
    }

    #[tokio::test(start_paused = true)]
    async fn head_sends_payload_then_forkchoice() {
        let h = Harness::start(RecordingEngine::new("el"));

        h.head_tx.send(update(100, 1)).await.unwrap();
        h.wait_for_calls(2).await;
        h.finalized_tx.send(update(90, 2)).await.unwrap();
        h.wait_for_calls(3).await;

        assert_eq!(
            h.engine.calls(),
            vec![
                EngineCall::NewPayload {
                    block_hash: hash(1),
                    versioned_hashes: vec![],
                    parent_beacon_block_root: hash(1 ^ 0xff),
                },
                EngineCall::ForkchoiceUpdated(fcu(1, 0)),
                EngineCall::ForkchoiceUpdated(fcu(1, 2)),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn finalized_alone_sends_only_forkchoice() {
        let h = Harness::start(RecordingEngine::new("el"));

        h.finalized_tx.send(update(90, 5)).await.unwrap();
        h.wait_for_calls(1).await;

        assert_eq!(h.engine.calls(), vec![EngineCall::ForkchoiceUpdated(fcu(5, 5))]);
    }

    #[tokio::test(start_paused = true)]
    async fn engine_failures_do_not_stop_delivery() {
        let h = Harness::start(RecordingEngine::new("el").failing());

        h.head_tx.send(update(1, 1)).await.unwrap();
        h.head_tx.send(update(2, 2)).await.unwrap();
        h.wait_for_calls(4).await;

        assert_eq!(h.engine.forkchoice_states(), vec![fcu(1, 0), fcu(2, 0)]);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_on_shutdown() {
        let h = Harness::start(RecordingEngine::new("el"));

        h.shutdown.cancel();
        h.task.await.unwrap();
        assert!(h.engine.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_the_fetch_side_is_gone() {
        let h = Harness::start(RecordingEngine::new("el"));

        drop(h.head_tx);
        drop(h.finalized_tx);
        h.task.await.unwrap();
    }
}
