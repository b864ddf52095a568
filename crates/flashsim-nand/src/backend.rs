use std::collections::VecDeque;

use flashsim_core::{ChannelId, PhysicalAddress, SimEvent, TxnId};
use flashsim_events::EventQueue;

use crate::config::{NandConfig, NandConfigError};
use crate::txn::{NandTransaction, TxnKind, TxnStatus, TxnStore};

/// One channel's transfer engine: at most one DMA in flight, the rest
/// queued FIFO. A finished DMA immediately starts the next queued one.
#[derive(Debug, Default)]
struct DmaEngine {
    current: Option<TxnId>,
    waiting: VecDeque<TxnId>,
}

/// The NAND device model. Holds per-die busy flags and per-channel DMA
/// engines; all latencies are expressed as scheduled events.
pub struct NandBackend {
    cfg: NandConfig,
    die_busy: Vec<bool>,
    channels: Vec<DmaEngine>,
    num_reads: u64,
    num_writes: u64,
}

impl NandBackend {
    pub fn new(cfg: NandConfig) -> Result<Self, NandConfigError> {
        cfg.validate()?;
        Ok(Self {
            die_busy: vec![false; cfg.num_dies()],
            channels: (0..cfg.channels).map(|_| DmaEngine::default()).collect(),
            num_reads: 0,
            num_writes: 0,
            cfg,
        })
    }

    pub fn config(&self) -> &NandConfig {
        &self.cfg
    }

    /// Pages read from the array since construction.
    pub fn num_reads(&self) -> u64 {
        self.num_reads
    }

    /// Pages programmed since construction.
    pub fn num_writes(&self) -> u64 {
        self.num_writes
    }

    /// True iff the die targeted by `pa` can accept an operation.
    pub fn is_ready(&self, pa: PhysicalAddress) -> bool {
        !self.die_busy[self.die_index(pa)]
    }

    fn die_index(&self, pa: PhysicalAddress) -> usize {
        let channel = pa.channel as usize;
        let die = pa.die as usize;
        assert!(
            channel < self.cfg.channels && die < self.cfg.dies_per_channel,
            "physical address {pa} outside geometry"
        );
        channel * self.cfg.dies_per_channel + die
    }

    /// Starts a page read: sense the array, then DMA the data out.
    pub fn read_page(&mut self, txn: &mut NandTransaction, q: &mut EventQueue<SimEvent>) {
        assert_eq!(txn.kind, TxnKind::Read, "read_page on a write transaction");
        let die = self.die_index(txn.ppa);
        assert!(!self.die_busy[die], "read issued to busy die at {}", txn.ppa);
        self.die_busy[die] = true;
        self.num_reads += 1;
        txn.status = TxnStatus::InFlight;
        tracing::debug!(txn = txn.id.0, ppa = %txn.ppa, "NAND read start");
        q.schedule_after(self.cfg.read_us, SimEvent::NandArrayReadDone(txn.id));
    }

    /// Starts a page write: DMA the data in, then program the cells.
    pub fn write_page(&mut self, txn: &mut NandTransaction, q: &mut EventQueue<SimEvent>) {
        assert_eq!(txn.kind, TxnKind::Write, "write_page on a read transaction");
        let die = self.die_index(txn.ppa);
        assert!(
            !self.die_busy[die],
            "write issued to busy die at {}",
            txn.ppa
        );
        self.die_busy[die] = true;
        self.num_writes += 1;
        txn.status = TxnStatus::InFlight;
        tracing::debug!(txn = txn.id.0, ppa = %txn.ppa, "NAND write start");
        self.enqueue_dma(txn.id, txn.ppa.channel_id(), q);
    }

    /// Array sensing finished; the read's data moves onto the channel.
    pub fn handle_array_read_done(
        &mut self,
        id: TxnId,
        txns: &TxnStore,
        q: &mut EventQueue<SimEvent>,
    ) {
        let channel = txns.get(id).ppa.channel_id();
        self.enqueue_dma(id, channel, q);
    }

    /// The channel's in-flight DMA finished. Starts the next queued DMA,
    /// and returns the finished transaction's id if the transaction is
    /// now complete (reads complete at DMA end; writes go on to program).
    pub fn handle_dma_complete(
        &mut self,
        channel: ChannelId,
        txns: &mut TxnStore,
        q: &mut EventQueue<SimEvent>,
    ) -> Option<TxnId> {
        let engine = &mut self.channels[channel.0];
        let finished = engine
            .current
            .take()
            .unwrap_or_else(|| panic!("DMA completion on idle channel {}", channel.0));
        if let Some(next) = engine.waiting.pop_front() {
            engine.current = Some(next);
            q.schedule_after(self.cfg.dma_us, SimEvent::NandDmaComplete(channel));
        }

        let txn = txns.get_mut(finished);
        match txn.kind {
            TxnKind::Read => {
                let die = self.die_index(txn.ppa);
                self.die_busy[die] = false;
                txn.status = TxnStatus::Completed;
                tracing::debug!(txn = finished.0, ppa = %txn.ppa, "NAND read complete");
                Some(finished)
            }
            TxnKind::Write => {
                q.schedule_after(self.cfg.program_us, SimEvent::NandProgramDone(finished));
                None
            }
        }
    }

    /// Programming finished; the write transaction is complete.
    pub fn handle_program_done(&mut self, id: TxnId, txns: &mut TxnStore) -> TxnId {
        let txn = txns.get_mut(id);
        let die = self.die_index(txn.ppa);
        debug_assert!(self.die_busy[die], "program completion on idle die");
        self.die_busy[die] = false;
        txn.status = TxnStatus::Completed;
        tracing::debug!(txn = id.0, ppa = %txn.ppa, "NAND write complete");
        id
    }

    fn enqueue_dma(&mut self, id: TxnId, channel: ChannelId, q: &mut EventQueue<SimEvent>) {
        let engine = &mut self.channels[channel.0];
        if engine.current.is_none() {
            engine.current = Some(id);
            q.schedule_after(self.cfg.dma_us, SimEvent::NandDmaComplete(channel));
        } else {
            engine.waiting.push_back(id);
        }
    }
}
