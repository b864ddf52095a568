use flashsim_core::{
    Lba, Lpa, PhysicalAddress, Request, RequestKind, RequestStore, SimEvent, Stage, TxnId,
};
use flashsim_events::EventQueue;
use flashsim_nand::{NandBackend, NandConfig, NandScheduler, TxnKind, TxnPayload, TxnStore};

fn pa(channel: u32, die: u32) -> PhysicalAddress {
    PhysicalAddress {
        channel,
        die,
        plane: 0,
        block: 0,
        page: 0,
    }
}

struct Rig {
    q: EventQueue<SimEvent>,
    nand: NandBackend,
    txns: TxnStore,
    requests: RequestStore,
    sched: NandScheduler,
}

impl Rig {
    fn new() -> Self {
        Self {
            q: EventQueue::new(),
            nand: NandBackend::new(NandConfig::default()).unwrap(),
            txns: TxnStore::new(),
            requests: RequestStore::new(),
            sched: NandScheduler::new(),
        }
    }

    fn dispatch(&mut self) {
        self.sched
            .try_dispatch(&mut self.nand, &mut self.txns, &mut self.requests, &mut self.q);
    }

    /// Runs the model to exhaustion, re-dispatching after every event the
    /// way the harness does. Returns (completion time, txn) pairs.
    fn run(&mut self) -> Vec<(u64, TxnId)> {
        let mut completed = Vec::new();
        self.dispatch();
        while let Some((_, ev)) = self.q.pop_next(None) {
            match ev {
                SimEvent::NandArrayReadDone(id) => {
                    self.nand.handle_array_read_done(id, &self.txns, &mut self.q)
                }
                SimEvent::NandDmaComplete(ch) => {
                    if let Some(done) = self.nand.handle_dma_complete(ch, &mut self.txns, &mut self.q)
                    {
                        self.sched.on_complete();
                        completed.push((self.q.now_us(), done));
                    }
                }
                SimEvent::NandProgramDone(id) => {
                    let done = self.nand.handle_program_done(id, &mut self.txns);
                    self.sched.on_complete();
                    completed.push((self.q.now_us(), done));
                }
                other => panic!("unexpected event {other:?}"),
            }
            self.dispatch();
        }
        completed
    }
}

#[test]
fn fifo_serializes_transactions_on_one_die() {
    let mut rig = Rig::new();
    let cfg = *rig.nand.config();

    let r1 = rig.requests.insert_with(|id| Request::new(id, RequestKind::Read, Lba(0), 0));
    let r2 = rig.requests.insert_with(|id| Request::new(id, RequestKind::Read, Lba(2), 0));
    let a = rig
        .txns
        .insert(TxnKind::Read, pa(0, 0), None, TxnPayload::HostRead(r1));
    let b = rig
        .txns
        .insert(TxnKind::Read, pa(0, 0), None, TxnPayload::HostRead(r2));
    rig.sched.submit(a);
    rig.sched.submit(b);

    let completed = rig.run();
    let first_done = cfg.read_us + cfg.dma_us;
    assert_eq!(
        completed,
        vec![(first_done, a), (2 * first_done, b)]
    );

    // The second read only starts once the first released the die.
    let t1_complete = rig.requests.get(r1).trace.get(Stage::NandReadComplete);
    let t2_start = rig.requests.get(r2).trace.get(Stage::NandReadStart);
    assert_eq!(t1_complete, Some(first_done));
    assert_eq!(t2_start, Some(first_done));
    assert!(rig.sched.is_idle());
}

#[test]
fn blocked_head_blocks_everything_behind_it() {
    let mut rig = Rig::new();

    // Head targets die (0,0); a transaction to the free die (1,1) sits
    // behind it. FIFO must not let the later one jump the queue.
    let hold = rig
        .txns
        .insert(TxnKind::Read, pa(0, 0), None, TxnPayload::RmwRead { lpa: Lpa(0) });
    rig.sched.submit(hold);
    rig.dispatch();
    assert!(!rig.nand.is_ready(pa(0, 0)));

    let behind = rig
        .txns
        .insert(TxnKind::Read, pa(1, 1), None, TxnPayload::RmwRead { lpa: Lpa(1) });
    let head = rig
        .txns
        .insert(TxnKind::Read, pa(0, 0), None, TxnPayload::RmwRead { lpa: Lpa(2) });
    rig.sched.submit(head);
    rig.sched.submit(behind);

    rig.dispatch();
    // Nothing else dispatched: the head's die is busy.
    assert_eq!(rig.sched.queue_len(), 2);
    assert!(rig.nand.is_ready(pa(1, 1)));

    let completed = rig.run();
    assert_eq!(completed.len(), 3);
    assert_eq!(completed[0].1, hold);
    assert_eq!(completed[1].1, head);
    assert_eq!(completed[2].1, behind);
}

#[test]
fn dependent_write_waits_for_its_read() {
    let mut rig = Rig::new();
    let cfg = *rig.nand.config();

    // Read-modify-write shape: merge read on one die, write on another,
    // gated on the read's completion rather than on die availability.
    let read = rig
        .txns
        .insert(TxnKind::Read, pa(0, 0), None, TxnPayload::RmwRead { lpa: Lpa(0) });
    let write = rig.txns.insert(
        TxnKind::Write,
        pa(1, 0),
        Some(read),
        TxnPayload::Writeback {
            lpa: Lpa(0),
            fua_requests: Vec::new(),
            origin: 0,
        },
    );
    rig.sched.submit(read);
    rig.sched.submit(write);

    rig.dispatch();
    // The write's die is free, but its dependency is still in flight.
    assert_eq!(rig.sched.queue_len(), 1);
    assert!(rig.nand.is_ready(pa(1, 0)));

    let completed = rig.run();
    let read_done = cfg.read_us + cfg.dma_us;
    assert_eq!(
        completed,
        vec![
            (read_done, read),
            (read_done + cfg.dma_us + cfg.program_us, write),
        ]
    );
}
