use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::addr::Lba;

/// Identifier of a host request, assigned monotonically by the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RequestId(pub usize);

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    Read,
    Write,
    Flush,
}

/// Request state, advancing monotonically. A request reported to the host
/// as completed never regresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Ready,
    InProgress,
    Completed,
}

bitflags! {
    /// Per-command modifier flags, NVMe style.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RequestFlags: u8 {
        /// Force unit access: the write completes to the host only after
        /// its data has been programmed to NAND.
        const FUA = 1 << 0;
    }
}

impl Serialize for RequestFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.bits())
    }
}

/// Named lifecycle stages a request can pass through. Each is stamped at
/// most once on the request's trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Ready,
    Arrival,
    CacheReadStart,
    CacheReadComplete,
    CacheWriteStart,
    CacheWriteComplete,
    NandReadStart,
    NandReadComplete,
    NandWriteStart,
    NandWriteComplete,
    Completion,
}

impl Stage {
    pub const COUNT: usize = 11;

    pub const ALL: [Stage; Stage::COUNT] = [
        Stage::Ready,
        Stage::Arrival,
        Stage::CacheReadStart,
        Stage::CacheReadComplete,
        Stage::CacheWriteStart,
        Stage::CacheWriteComplete,
        Stage::NandReadStart,
        Stage::NandReadComplete,
        Stage::NandWriteStart,
        Stage::NandWriteComplete,
        Stage::Completion,
    ];

    fn index(self) -> usize {
        match self {
            Stage::Ready => 0,
            Stage::Arrival => 1,
            Stage::CacheReadStart => 2,
            Stage::CacheReadComplete => 3,
            Stage::CacheWriteStart => 4,
            Stage::CacheWriteComplete => 5,
            Stage::NandReadStart => 6,
            Stage::NandReadComplete => 7,
            Stage::NandWriteStart => 8,
            Stage::NandWriteComplete => 9,
            Stage::Completion => 10,
        }
    }
}

/// Per-request timestamps, one slot per lifecycle stage. Serializes as a
/// map of recorded stages only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StageTrace {
    stamps: [Option<u64>; Stage::COUNT],
}

impl Serialize for StageTrace {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(None)?;
        for stage in Stage::ALL {
            if let Some(t) = self.get(stage) {
                map.serialize_entry(&stage, &t)?;
            }
        }
        map.end()
    }
}

impl StageTrace {
    /// Stamps a stage. A stage is recorded at most once; a second stamp is
    /// a model bug and the first timestamp wins.
    pub fn record(&mut self, stage: Stage, time_us: u64) {
        let slot = &mut self.stamps[stage.index()];
        debug_assert!(
            slot.is_none(),
            "stage {stage:?} stamped twice (at {:?} and {time_us})",
            slot
        );
        slot.get_or_insert(time_us);
    }

    pub fn get(&self, stage: Stage) -> Option<u64> {
        self.stamps[stage.index()]
    }

    pub fn contains(&self, stage: Stage) -> bool {
        self.get(stage).is_some()
    }
}

/// A unit of host I/O.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub id: RequestId,
    pub kind: RequestKind,
    pub lba: Lba,
    /// Earliest simulated time at which the request may enter the NCQ.
    pub ready_time_us: u64,
    pub flags: RequestFlags,
    pub status: RequestStatus,
    pub trace: StageTrace,
}

impl Request {
    pub fn new(id: RequestId, kind: RequestKind, lba: Lba, ready_time_us: u64) -> Self {
        let mut trace = StageTrace::default();
        trace.record(Stage::Ready, ready_time_us);
        Self {
            id,
            kind,
            lba,
            ready_time_us,
            flags: RequestFlags::empty(),
            status: RequestStatus::Ready,
            trace,
        }
    }

    pub fn with_flags(mut self, flags: RequestFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn fua(&self) -> bool {
        self.flags.contains(RequestFlags::FUA)
    }

    pub fn mark_in_progress(&mut self) {
        assert_eq!(
            self.status,
            RequestStatus::Ready,
            "{} issued twice",
            self.id
        );
        self.status = RequestStatus::InProgress;
    }

    pub fn mark_completed(&mut self) {
        assert_ne!(
            self.status,
            RequestStatus::Completed,
            "{} completed twice",
            self.id
        );
        self.status = RequestStatus::Completed;
    }

    /// Arrival-to-completion latency, once completed.
    pub fn response_time_us(&self) -> Option<u64> {
        let arrival = self.trace.get(Stage::Arrival)?;
        let completion = self.trace.get(Stage::Completion)?;
        Some(completion - arrival)
    }
}

/// Slab of in-flight requests, owned by the simulator. The NCQ holds ids;
/// completion takes the request out of the store, so a completed request
/// can never be mutated again.
#[derive(Debug, Default)]
pub struct RequestStore {
    slots: Vec<Option<Request>>,
}

impl RequestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates the next id and stores the request built from it.
    pub fn insert_with(&mut self, build: impl FnOnce(RequestId) -> Request) -> RequestId {
        let id = RequestId(self.slots.len());
        let request = build(id);
        debug_assert_eq!(request.id, id);
        self.slots.push(Some(request));
        id
    }

    pub fn get(&self, id: RequestId) -> &Request {
        self.slots[id.0]
            .as_ref()
            .unwrap_or_else(|| panic!("{id} no longer in flight"))
    }

    pub fn get_mut(&mut self, id: RequestId) -> &mut Request {
        self.slots[id.0]
            .as_mut()
            .unwrap_or_else(|| panic!("{id} no longer in flight"))
    }

    /// Removes a request at completion; the slot stays vacant.
    pub fn take(&mut self, id: RequestId) -> Request {
        self.slots[id.0]
            .take()
            .unwrap_or_else(|| panic!("{id} no longer in flight"))
    }
}
