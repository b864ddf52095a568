use std::collections::VecDeque;

use flashsim_cache::WriteCache;
use flashsim_core::{
    Lba, Request, RequestFlags, RequestId, RequestKind, RequestStore, SimEvent, SimEventKind,
    Stage, TxnId,
};
use flashsim_events::{EventId, EventQueue, HandlerRegistry};
use flashsim_ftl::Ftl;
use flashsim_nand::{NandBackend, NandScheduler, TxnPayload, TxnStore};
use serde::Serialize;

use crate::config::{SimError, SimulatorConfig};
use crate::frontend::FrontendScheduler;
use crate::stats::Stats;
use crate::trace::TraceRequest;

/// Which component owns an event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    Harness,
    Cache,
    Nand,
}

/// Result of one simulation run: every completed request in completion
/// order, with its full lifecycle trace, plus the aggregate counters.
#[derive(Debug, Serialize)]
pub struct SimReport {
    pub completed: Vec<Request>,
    pub stats: Stats,
}

/// The assembled device. Owns every component; completions are routed
/// through the event queue, so no component ever calls back into its
/// caller reentrantly.
pub struct Simulator {
    cfg: SimulatorConfig,
    q: EventQueue<SimEvent>,
    handlers: HandlerRegistry<SimEventKind, Handler>,
    requests: RequestStore,
    frontend: FrontendScheduler,
    cache: WriteCache,
    ftl: Ftl,
    nand: NandBackend,
    nand_sched: NandScheduler,
    txns: TxnStore,
    /// Trace requests beyond the NCQ window, admitted one per completion.
    backlog: VecDeque<RequestId>,
    completed: Vec<Request>,
    host_reads: u64,
    host_writes: u64,
}

impl Simulator {
    pub fn new(cfg: SimulatorConfig) -> Result<Self, SimError> {
        cfg.validate()?;

        let mut handlers = HandlerRegistry::new();
        for kind in SimEventKind::ALL {
            let handler = match kind {
                SimEventKind::RequestArrival | SimEventKind::RequestComplete => Handler::Harness,
                SimEventKind::CacheReadComplete
                | SimEventKind::CacheWriteComplete
                | SimEventKind::CacheFlushStart => Handler::Cache,
                SimEventKind::NandArrayReadDone
                | SimEventKind::NandDmaComplete
                | SimEventKind::NandProgramDone => Handler::Nand,
            };
            handlers.register(kind, handler)?;
        }

        Ok(Self {
            q: EventQueue::new(),
            handlers,
            requests: RequestStore::new(),
            frontend: FrontendScheduler::new(cfg.ncq_size),
            cache: WriteCache::new(cfg.cache)?,
            ftl: Ftl::new(cfg.ftl, cfg.nand)?,
            nand: NandBackend::new(cfg.nand)?,
            nand_sched: NandScheduler::new(),
            txns: TxnStore::new(),
            backlog: VecDeque::new(),
            completed: Vec::new(),
            host_reads: 0,
            host_writes: 0,
            cfg,
        })
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.cfg
    }

    /// Direct FTL access, for seeding mappings of previously-written data
    /// before a run.
    pub fn ftl_mut(&mut self) -> &mut Ftl {
        &mut self.ftl
    }

    /// Runs the trace to exhaustion. A simulator holds one run's worth of
    /// state; build a fresh one per trace.
    pub fn run(&mut self, trace: &[TraceRequest]) -> SimReport {
        self.run_until(trace, None)
    }

    /// Runs the trace until the queue drains or the next event lies past
    /// `until_us`. Stopping does not cancel queued events; only requests
    /// that completed in time appear in the report.
    pub fn run_until(&mut self, trace: &[TraceRequest], until_us: Option<u64>) -> SimReport {
        self.admit(trace);

        while let Some((event_id, ev)) = self.q.pop_next(until_us) {
            self.dispatch(event_id, ev);
            // A dispatched event may have freed the cache port, a die or
            // an NCQ slot: give both schedulers a chance to use it.
            self.frontend.tick(
                &mut self.requests,
                &mut self.cache,
                &mut self.ftl,
                &mut self.txns,
                &mut self.nand_sched,
                &mut self.q,
            );
            self.nand_sched.try_dispatch(
                &mut self.nand,
                &mut self.txns,
                &mut self.requests,
                &mut self.q,
            );
        }

        let completed = std::mem::take(&mut self.completed);
        let cache_read_hits = completed
            .iter()
            .filter(|r| r.kind == RequestKind::Read && r.trace.contains(Stage::CacheReadStart))
            .count() as u64;
        SimReport {
            stats: Stats {
                nand_reads: self.nand.num_reads(),
                nand_writes: self.nand.num_writes(),
                host_reads: self.host_reads,
                host_writes: self.host_writes,
                cache_read_hits,
                lbas_per_page: self.ftl.lbas_per_page(),
            },
            completed,
        }
    }

    /// Creates the run's requests and schedules arrivals for the first
    /// NCQ-window's worth; the rest wait in the backlog and are admitted
    /// one-for-one as requests complete.
    fn admit(&mut self, trace: &[TraceRequest]) {
        for (slot, entry) in trace.iter().enumerate() {
            match entry.kind {
                RequestKind::Read => self.host_reads += 1,
                RequestKind::Write => self.host_writes += 1,
                RequestKind::Flush => {}
            }
            let flags = if entry.fua {
                RequestFlags::FUA
            } else {
                RequestFlags::empty()
            };
            let id = self.requests.insert_with(|id| {
                Request::new(id, entry.kind, Lba(entry.lba), entry.ready_time_us).with_flags(flags)
            });
            if slot < self.cfg.ncq_size {
                self.q
                    .schedule_at(entry.ready_time_us, SimEvent::RequestArrival(id));
            } else {
                self.backlog.push_back(id);
            }
        }
    }

    fn dispatch(&mut self, event_id: EventId, ev: SimEvent) {
        tracing::trace!(t = self.q.now_us(), ?ev, "dispatch");
        let handler = self
            .handlers
            .lookup(ev.kind())
            .unwrap_or_else(|| panic!("no handler registered for {:?}", ev.kind()));
        match handler {
            Handler::Harness => self.handle_harness_event(ev),
            Handler::Cache => self.handle_cache_event(event_id, ev),
            Handler::Nand => self.handle_nand_event(ev),
        }
    }

    fn handle_harness_event(&mut self, ev: SimEvent) {
        match ev {
            SimEvent::RequestArrival(id) => {
                let now = self.q.now_us();
                self.requests.get_mut(id).trace.record(Stage::Arrival, now);
                self.frontend.submit(id);
            }
            SimEvent::RequestComplete(id) => {
                let mut request = self.requests.take(id);
                request.trace.record(Stage::Completion, self.q.now_us());
                request.mark_completed();
                self.frontend.remove(id);
                tracing::debug!(req = id.0, t = self.q.now_us(), "request completed");
                self.completed.push(request);

                // One slot freed: admit the next backlogged request.
                if let Some(next) = self.backlog.pop_front() {
                    let ready = self.requests.get(next).ready_time_us;
                    let at = ready.max(self.q.now_us());
                    self.q.schedule_at(at, SimEvent::RequestArrival(next));
                }
            }
            other => unreachable!("harness got {other:?}"),
        }
    }

    fn handle_cache_event(&mut self, event_id: EventId, ev: SimEvent) {
        match ev {
            SimEvent::CacheReadComplete(id) => {
                let request = self.requests.get_mut(id);
                self.cache.handle_read_complete(request, &mut self.q);
            }
            SimEvent::CacheWriteComplete(id) => {
                let request = self.requests.get_mut(id);
                self.cache
                    .handle_write_complete(request, &self.ftl, &mut self.q);
            }
            SimEvent::CacheFlushStart(lpa) => {
                self.cache.handle_flush_start(
                    lpa,
                    event_id,
                    &mut self.ftl,
                    &mut self.txns,
                    &mut self.nand_sched,
                    &mut self.q,
                );
            }
            other => unreachable!("cache got {other:?}"),
        }
    }

    fn handle_nand_event(&mut self, ev: SimEvent) {
        match ev {
            SimEvent::NandArrayReadDone(id) => {
                self.nand.handle_array_read_done(id, &self.txns, &mut self.q);
            }
            SimEvent::NandDmaComplete(channel) => {
                if let Some(done) = self.nand.handle_dma_complete(channel, &mut self.txns, &mut self.q)
                {
                    self.finish_txn(done);
                }
            }
            SimEvent::NandProgramDone(id) => {
                let done = self.nand.handle_program_done(id, &mut self.txns);
                self.finish_txn(done);
            }
            other => unreachable!("NAND got {other:?}"),
        }
    }

    /// Routes a finished NAND transaction to whoever it carries.
    fn finish_txn(&mut self, id: TxnId) {
        self.nand_sched.on_complete();
        match self.txns.get(id).payload.clone() {
            TxnPayload::HostRead(req) => {
                let now = self.q.now_us();
                self.requests
                    .get_mut(req)
                    .trace
                    .record(Stage::NandReadComplete, now);
                self.q.schedule_at(now, SimEvent::RequestComplete(req));
            }
            TxnPayload::Writeback {
                lpa,
                fua_requests,
                origin,
            } => {
                self.cache.handle_writeback_complete(
                    lpa,
                    origin,
                    &fua_requests,
                    &mut self.requests,
                    &mut self.q,
                );
            }
            TxnPayload::RmwRead { .. } => {}
        }
    }
}
