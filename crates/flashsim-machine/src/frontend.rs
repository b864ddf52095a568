use std::collections::HashSet;

use flashsim_cache::WriteCache;
use flashsim_core::{
    Lba, RequestId, RequestKind, RequestStatus, RequestStore, SimEvent, Stage,
};
use flashsim_events::EventQueue;
use flashsim_ftl::Ftl;
use flashsim_nand::{NandScheduler, TxnKind, TxnPayload, TxnStore};

/// The NCQ scheduler: walks the queue head-to-tail every tick, routing
/// ready requests to the cache or the NAND scheduler while enforcing
/// per-LBA ordering.
///
/// Hazards are tracked with a `dirty_lbas` set rebuilt on every walk: a
/// write whose data has not yet reached the cache dirties its LBA, and
/// a read of a dirty LBA waits (RAW). Writes serialize through the
/// cache's single port in queue order (WAW). A read issued to NAND
/// captures its physical address at issue time; later writes always
/// allocate a fresh page and cannot retarget it (WAR).
pub struct FrontendScheduler {
    capacity: usize,
    ncq: Vec<RequestId>,
}

impl FrontendScheduler {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "NCQ capacity must be non-zero");
        Self {
            capacity,
            ncq: Vec::with_capacity(capacity),
        }
    }

    pub fn has_space(&self) -> bool {
        self.ncq.len() < self.capacity
    }

    pub fn len(&self) -> usize {
        self.ncq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ncq.is_empty()
    }

    /// Admits an arrived request. The harness owns admission control and
    /// never submits past capacity; overflowing is a model bug.
    pub fn submit(&mut self, id: RequestId) {
        assert!(self.has_space(), "NCQ is full");
        self.ncq.push(id);
    }

    /// Drops a completed request from the queue.
    pub fn remove(&mut self, id: RequestId) {
        let pos = self
            .ncq
            .iter()
            .position(|&r| r == id)
            .unwrap_or_else(|| panic!("{id} not in NCQ"));
        self.ncq.remove(pos);
    }

    /// One scheduling pass over the queue.
    pub fn tick(
        &mut self,
        requests: &mut RequestStore,
        cache: &mut WriteCache,
        ftl: &mut Ftl,
        txns: &mut TxnStore,
        nand_sched: &mut NandScheduler,
        q: &mut EventQueue<SimEvent>,
    ) {
        let mut dirty_lbas: HashSet<Lba> = HashSet::new();

        for &id in &self.ncq {
            let (kind, lba, status, in_cache) = {
                let r = requests.get(id);
                (
                    r.kind,
                    r.lba,
                    r.status,
                    r.trace.contains(Stage::CacheWriteComplete),
                )
            };

            match kind {
                RequestKind::Write => {
                    // The LBA stays hazardous until the write's data is
                    // cache-resident; readers behind it must wait.
                    if !in_cache {
                        dirty_lbas.insert(lba);
                    }
                    if status != RequestStatus::Ready {
                        continue;
                    }
                    if cache.is_busy() || !cache.can_hold(lba, ftl) {
                        continue;
                    }
                    requests.get_mut(id).mark_in_progress();
                    cache.put(requests.get_mut(id), ftl, q);
                }
                RequestKind::Read => {
                    if status != RequestStatus::Ready {
                        continue;
                    }
                    if dirty_lbas.contains(&lba) {
                        continue;
                    }
                    if cache.contains(lba, ftl) {
                        if cache.is_busy() {
                            continue;
                        }
                        requests.get_mut(id).mark_in_progress();
                        cache.get(requests.get_mut(id), ftl, q);
                    } else {
                        requests.get_mut(id).mark_in_progress();
                        match ftl.lpa_to_ppa(ftl.lba_to_lpa(lba)) {
                            Some(ppa) => {
                                let txn = txns.insert(
                                    TxnKind::Read,
                                    ppa,
                                    None,
                                    TxnPayload::HostRead(id),
                                );
                                nand_sched.submit(txn);
                            }
                            None => {
                                // Never-written LBA: unmapped space reads
                                // as zeroes without touching NAND.
                                q.schedule_at(q.now_us(), SimEvent::RequestComplete(id));
                            }
                        }
                    }
                }
                RequestKind::Flush => {
                    // A flush is a barrier: nothing behind it issues until
                    // every earlier request has left the queue and all
                    // dirty data has reached NAND. In-flight transactions
                    // need no separate check: a writeback keeps its page
                    // in FLUSHING until it lands, and a host read keeps
                    // its request in the NCQ ahead of the flush.
                    if status == RequestStatus::Ready
                        && self.ncq.first() == Some(&id)
                        && nand_sched.queue_len() == 0
                        && !cache.any_flush_pending()
                    {
                        requests.get_mut(id).mark_in_progress();
                        q.schedule_at(q.now_us(), SimEvent::RequestComplete(id));
                    }
                    break;
                }
            }
        }
    }
}
