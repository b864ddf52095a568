use std::collections::VecDeque;

use flashsim_core::{RequestStore, SimEvent, Stage, TxnId};
use flashsim_events::EventQueue;

use crate::backend::NandBackend;
use crate::txn::{TxnKind, TxnPayload, TxnStore};

/// FIFO transaction scheduler over a single submission queue.
///
/// Only the head is ever considered; a head blocked on its die or on an
/// incomplete dependency blocks everything behind it until a later tick.
/// Smarter policies may reorder, but must preserve the per-LBA ordering
/// the frontend establishes.
#[derive(Debug, Default)]
pub struct NandScheduler {
    queue: VecDeque<TxnId>,
    in_flight: usize,
}

impl NandScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(&mut self, id: TxnId) {
        tracing::debug!(txn = id.0, depth = self.queue.len() + 1, "txn submitted");
        self.queue.push_back(id);
    }

    /// No queued work and nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.queue.is_empty() && self.in_flight == 0
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Dispatches from the head while the head's die is ready and its
    /// dependency (if any) has completed. Blocked heads are simply left
    /// in place; contention is not an error.
    pub fn try_dispatch(
        &mut self,
        nand: &mut NandBackend,
        txns: &mut TxnStore,
        requests: &mut RequestStore,
        q: &mut EventQueue<SimEvent>,
    ) {
        while let Some(&head) = self.queue.front() {
            let dispatchable = {
                let txn = txns.get(head);
                nand.is_ready(txn.ppa) && txn.depends_on.map_or(true, |dep| txns.is_completed(dep))
            };
            if !dispatchable {
                return;
            }
            self.queue.pop_front();
            self.in_flight += 1;

            // Dispatch is where device work begins for the host's view.
            match &txns.get(head).payload {
                TxnPayload::HostRead(req) => {
                    requests
                        .get_mut(*req)
                        .trace
                        .record(Stage::NandReadStart, q.now_us());
                }
                TxnPayload::Writeback { fua_requests, .. } => {
                    for req in fua_requests.clone() {
                        requests
                            .get_mut(req)
                            .trace
                            .record(Stage::NandWriteStart, q.now_us());
                    }
                }
                TxnPayload::RmwRead { .. } => {}
            }

            let txn = txns.get_mut(head);
            match txn.kind {
                TxnKind::Read => nand.read_page(txn, q),
                TxnKind::Write => nand.write_page(txn, q),
            }
        }
    }

    /// Called by the harness when a dispatched transaction completes.
    pub fn on_complete(&mut self) {
        assert!(self.in_flight > 0, "completion with nothing in flight");
        self.in_flight -= 1;
    }
}
