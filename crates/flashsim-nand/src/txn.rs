use flashsim_core::{Lpa, PhysicalAddress, RequestId, TxnId};
use flashsim_events::EventId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnKind {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnStatus {
    Pending,
    InFlight,
    Completed,
}

/// Who gets notified when the transaction finishes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxnPayload {
    /// An uncached host read; completing it completes the request.
    HostRead(RequestId),
    /// A cache writeback. `fua_requests` is the set of FUA writes
    /// snapshotted when the flush was issued; `origin` is the flush
    /// event that issued it, compared against the page's latest flush
    /// event to decide eviction.
    Writeback {
        lpa: Lpa,
        fua_requests: Vec<RequestId>,
        origin: EventId,
    },
    /// The merge read ahead of a partial-page writeback. Completion only
    /// unblocks the dependent write.
    RmwRead { lpa: Lpa },
}

/// A unit of work for the NAND back end, targeting exactly one die.
#[derive(Debug, Clone)]
pub struct NandTransaction {
    pub id: TxnId,
    pub kind: TxnKind,
    pub ppa: PhysicalAddress,
    /// A prior transaction that must complete before this one is issued.
    pub depends_on: Option<TxnId>,
    pub status: TxnStatus,
    pub payload: TxnPayload,
}

/// Slab of NAND transactions, owned by the simulator. Completed
/// transactions stay resident so `depends_on` checks remain answerable.
#[derive(Debug, Default)]
pub struct TxnStore {
    slots: Vec<NandTransaction>,
}

impl TxnStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        kind: TxnKind,
        ppa: PhysicalAddress,
        depends_on: Option<TxnId>,
        payload: TxnPayload,
    ) -> TxnId {
        let id = TxnId(self.slots.len());
        self.slots.push(NandTransaction {
            id,
            kind,
            ppa,
            depends_on,
            status: TxnStatus::Pending,
            payload,
        });
        id
    }

    pub fn get(&self, id: TxnId) -> &NandTransaction {
        &self.slots[id.0]
    }

    pub fn get_mut(&mut self, id: TxnId) -> &mut NandTransaction {
        &mut self.slots[id.0]
    }

    pub fn is_completed(&self, id: TxnId) -> bool {
        self.get(id).status == TxnStatus::Completed
    }
}
