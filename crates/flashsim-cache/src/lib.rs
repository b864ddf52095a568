//! Write-back cache with per-page write coalescing.
//!
//! Writes land in a [`CachePage`] keyed by logical page address and sit
//! there for a writeback delay, so back-to-back writes to the same page
//! coalesce into one NAND program. A page whose flush is already
//! scheduled is re-dirtied by a new write: the pending flush event is
//! canceled and a fresh delay starts when the new write's transfer
//! completes. Partial pages are flushed read-modify-write.
//!
//! The cache has a single port to the frontend: one transfer (`get` or
//! `put`) at a time, guarded by the `busy` flag. The frontend checks
//! `is_busy` before issuing; calling through a busy port is a model bug.

use std::collections::{BTreeSet, HashMap};

use flashsim_core::{Lba, Lpa, Request, RequestId, RequestStore, SimEvent, Stage, TxnId};
use flashsim_events::{EventId, EventQueue};
use flashsim_ftl::Ftl;
use flashsim_nand::{NandScheduler, TxnKind, TxnPayload, TxnStore};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheConfigError {
    #[error("cache must have at least one page")]
    ZeroPages,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Number of coalescing pages resident at once.
    pub num_pages: usize,
    /// Host-to-cache transfer time for one write.
    pub write_us: u64,
    /// Cache-to-host transfer time for one read hit.
    pub read_us: u64,
    /// Coalescing window between a write landing and its flush issuing.
    pub writeback_delay_us: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            num_pages: 2,
            write_us: 10,
            read_us: 10,
            writeback_delay_us: 500,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), CacheConfigError> {
        if self.num_pages == 0 {
            return Err(CacheConfigError::ZeroPages);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageState {
    /// Holds data not yet scheduled for writeback.
    Dirty,
    /// A flush event is pending in the queue.
    FlushScheduled,
    /// The writeback transaction has been issued to NAND.
    Flushing,
}

/// A coalescing buffer at physical-page granularity.
#[derive(Debug)]
pub struct CachePage {
    pub lpa: Lpa,
    pub state: PageState,
    /// LBAs with valid data in this page; always within the page's
    /// `[lpa*K, lpa*K + K)` window.
    pub lbas: BTreeSet<Lba>,
    /// FUA writes whose host completion is gated on the next flush.
    pending_fua: Vec<RequestId>,
    /// The most recent flush event scheduled for this page. Only the
    /// event matching this id performs a flush; older ones are no-ops.
    latest_flush_event: Option<EventId>,
    /// The writeback transaction currently in flight, if any.
    active_writeback: Option<TxnId>,
    /// A flush fired while a writeback was still in flight and was
    /// postponed; re-armed when that writeback completes.
    deferred_flush: bool,
}

impl CachePage {
    fn new(lpa: Lpa) -> Self {
        Self {
            lpa,
            state: PageState::Dirty,
            lbas: BTreeSet::new(),
            pending_fua: Vec::new(),
            latest_flush_event: None,
            active_writeback: None,
            deferred_flush: false,
        }
    }
}

pub struct WriteCache {
    cfg: CacheConfig,
    pages: HashMap<Lpa, CachePage>,
    busy: bool,
}

impl WriteCache {
    pub fn new(cfg: CacheConfig) -> Result<Self, CacheConfigError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            pages: HashMap::new(),
            busy: false,
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.cfg
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// True iff a read of `lba` can be served from the cache.
    pub fn contains(&self, lba: Lba, ftl: &Ftl) -> bool {
        self.pages
            .get(&ftl.lba_to_lpa(lba))
            .is_some_and(|page| page.lbas.contains(&lba))
    }

    /// True iff a write to `lba` can be admitted: its page is already
    /// resident, or there is room for a new one.
    pub fn can_hold(&self, lba: Lba, ftl: &Ftl) -> bool {
        self.pages.contains_key(&ftl.lba_to_lpa(lba)) || self.pages.len() < self.cfg.num_pages
    }

    /// True while any page still has a scheduled or in-flight flush.
    /// Feeds the FLUSH drain condition.
    pub fn any_flush_pending(&self) -> bool {
        self.pages
            .values()
            .any(|p| matches!(p.state, PageState::FlushScheduled | PageState::Flushing))
    }

    pub fn resident_pages(&self) -> usize {
        self.pages.len()
    }

    pub fn page_state(&self, lpa: Lpa) -> Option<PageState> {
        self.pages.get(&lpa).map(|p| p.state)
    }

    /// Serves a read hit. Precondition: port idle and `contains`.
    pub fn get(&mut self, request: &mut Request, ftl: &Ftl, q: &mut EventQueue<SimEvent>) {
        assert!(!self.busy, "cache get through a busy port");
        assert!(
            self.contains(request.lba, ftl),
            "cache get misses {}",
            request.lba
        );
        self.busy = true;
        request.trace.record(Stage::CacheReadStart, q.now_us());
        tracing::debug!(req = request.id.0, lba = request.lba.0, "cache read start");
        q.schedule_after(self.cfg.read_us, SimEvent::CacheReadComplete(request.id));
    }

    /// Accepts a write. Precondition: port idle and `can_hold`. A page
    /// whose flush is scheduled but not yet issued is re-dirtied: the
    /// pending flush is canceled and rescheduled after this write lands.
    pub fn put(&mut self, request: &mut Request, ftl: &Ftl, q: &mut EventQueue<SimEvent>) {
        assert!(!self.busy, "cache put through a busy port");
        assert!(
            self.can_hold(request.lba, ftl),
            "cache put with no room for {}",
            request.lba
        );
        self.busy = true;
        request.trace.record(Stage::CacheWriteStart, q.now_us());

        let lpa = ftl.lba_to_lpa(request.lba);
        if let Some(page) = self.pages.get_mut(&lpa) {
            if page.state == PageState::FlushScheduled {
                let event = page
                    .latest_flush_event
                    .take()
                    .expect("flush scheduled without an event");
                q.cancel(event);
                page.state = PageState::Dirty;
                tracing::debug!(lpa = lpa.0, "flush canceled, page re-dirtied");
            }
        }

        tracing::debug!(req = request.id.0, lba = request.lba.0, "cache write start");
        q.schedule_after(self.cfg.write_us, SimEvent::CacheWriteComplete(request.id));
    }

    /// The cache-to-host transfer of a read hit finished; the request
    /// completes at the current time.
    pub fn handle_read_complete(&mut self, request: &mut Request, q: &mut EventQueue<SimEvent>) {
        self.busy = false;
        request.trace.record(Stage::CacheReadComplete, q.now_us());
        q.schedule_at(q.now_us(), SimEvent::RequestComplete(request.id));
    }

    /// The host-to-cache transfer of a write finished: the data is now
    /// cache-resident, the request completes (unless FUA), and the
    /// page's writeback clock starts.
    pub fn handle_write_complete(
        &mut self,
        request: &mut Request,
        ftl: &Ftl,
        q: &mut EventQueue<SimEvent>,
    ) {
        self.busy = false;
        request.trace.record(Stage::CacheWriteComplete, q.now_us());

        if !request.fua() {
            q.schedule_at(q.now_us(), SimEvent::RequestComplete(request.id));
        }

        let lpa = ftl.lba_to_lpa(request.lba);
        let lbas_per_page = ftl.lbas_per_page();
        // The page normally exists since `put`; it can only have vanished
        // if a writeback evicted it while this transfer was in flight.
        let page = self.pages.entry(lpa).or_insert_with(|| CachePage::new(lpa));
        assert!(
            request.lba.0 / lbas_per_page == lpa.0,
            "{} outside page window of {}",
            request.lba,
            lpa
        );
        page.lbas.insert(request.lba);
        if request.fua() {
            page.pending_fua.push(request.id);
        }

        page.state = PageState::FlushScheduled;
        let event = q.schedule_after(
            self.cfg.writeback_delay_us,
            SimEvent::CacheFlushStart(lpa),
        );
        page.latest_flush_event = Some(event);
        assert!(
            self.pages.len() <= self.cfg.num_pages,
            "cache over capacity"
        );
    }

    /// The writeback delay for a page elapsed. Issues the flush unless a
    /// newer flush superseded this event, deferring instead when the
    /// previous writeback for this page is still in flight.
    pub fn handle_flush_start(
        &mut self,
        lpa: Lpa,
        event: EventId,
        ftl: &mut Ftl,
        txns: &mut TxnStore,
        sched: &mut NandScheduler,
        q: &mut EventQueue<SimEvent>,
    ) {
        let Some(page) = self.pages.get_mut(&lpa) else {
            return;
        };
        if page.latest_flush_event != Some(event) {
            return;
        }
        if page.active_writeback.is_some() {
            page.deferred_flush = true;
            return;
        }

        page.state = PageState::Flushing;

        // Partial page: merge with the current on-NAND copy first. A page
        // never mapped gets a backing page allocated so the merge read
        // has a source.
        let read_txn = if (page.lbas.len() as u64) < ftl.lbas_per_page() {
            let src = ftl
                .lpa_to_ppa(lpa)
                .unwrap_or_else(|| ftl.allocate(lpa));
            let id = txns.insert(TxnKind::Read, src, None, TxnPayload::RmwRead { lpa });
            sched.submit(id);
            Some(id)
        } else {
            None
        };

        let dst = ftl.allocate(lpa);
        let fua_requests = std::mem::take(&mut page.pending_fua);
        let write = txns.insert(
            TxnKind::Write,
            dst,
            read_txn,
            TxnPayload::Writeback {
                lpa,
                fua_requests,
                origin: event,
            },
        );
        sched.submit(write);
        page.active_writeback = Some(write);
        tracing::debug!(lpa = lpa.0, rmw = read_txn.is_some(), "writeback issued");
    }

    /// A writeback transaction finished on NAND: FUA writes it carried
    /// complete now, and the page is evicted unless a newer write
    /// re-dirtied it while the flush was in flight.
    pub fn handle_writeback_complete(
        &mut self,
        lpa: Lpa,
        origin: EventId,
        fua_requests: &[RequestId],
        requests: &mut RequestStore,
        q: &mut EventQueue<SimEvent>,
    ) {
        let page = self
            .pages
            .get_mut(&lpa)
            .unwrap_or_else(|| panic!("writeback completed for evicted {lpa}"));
        page.active_writeback = None;

        for &req in fua_requests {
            let request = requests.get_mut(req);
            request.trace.record(Stage::NandWriteComplete, q.now_us());
            q.schedule_at(q.now_us(), SimEvent::RequestComplete(req));
        }

        if page.state == PageState::Flushing && page.latest_flush_event == Some(origin) {
            self.pages.remove(&lpa);
            tracing::debug!(lpa = lpa.0, "page evicted after writeback");
        } else if page.deferred_flush {
            page.deferred_flush = false;
            let event = q.schedule_at(q.now_us(), SimEvent::CacheFlushStart(lpa));
            page.latest_flush_event = Some(event);
        }
    }
}
