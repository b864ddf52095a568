use serde::Serialize;

use crate::addr::{ChannelId, Lpa};
use crate::request::RequestId;

/// Identifier of a NAND transaction, allocated by the transaction store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TxnId(pub usize);

/// The closed set of events flowing through the simulator.
///
/// The variant is the event kind; its field is the payload the handler
/// needs. Routing goes through the handler registry keyed by
/// [`SimEventKind`], so every kind is claimed by exactly one component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimEvent {
    /// A host request's ready time elapsed; it enters the NCQ.
    RequestArrival(RequestId),
    /// Cache-to-host transfer for a read hit finished.
    CacheReadComplete(RequestId),
    /// Host-to-cache transfer for a write finished.
    CacheWriteComplete(RequestId),
    /// A page's writeback delay elapsed; the flush may issue.
    CacheFlushStart(Lpa),
    /// NAND array sensing for a read finished; data is ready for DMA.
    NandArrayReadDone(TxnId),
    /// The in-flight DMA on a channel finished.
    NandDmaComplete(ChannelId),
    /// NAND program for a write finished; the die is free.
    NandProgramDone(TxnId),
    /// A request finished all device work and completes to the host.
    RequestComplete(RequestId),
}

/// Fieldless mirror of [`SimEvent`], used as the handler-registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimEventKind {
    RequestArrival,
    CacheReadComplete,
    CacheWriteComplete,
    CacheFlushStart,
    NandArrayReadDone,
    NandDmaComplete,
    NandProgramDone,
    RequestComplete,
}

impl SimEvent {
    pub fn kind(&self) -> SimEventKind {
        match self {
            SimEvent::RequestArrival(_) => SimEventKind::RequestArrival,
            SimEvent::CacheReadComplete(_) => SimEventKind::CacheReadComplete,
            SimEvent::CacheWriteComplete(_) => SimEventKind::CacheWriteComplete,
            SimEvent::CacheFlushStart(_) => SimEventKind::CacheFlushStart,
            SimEvent::NandArrayReadDone(_) => SimEventKind::NandArrayReadDone,
            SimEvent::NandDmaComplete(_) => SimEventKind::NandDmaComplete,
            SimEvent::NandProgramDone(_) => SimEventKind::NandProgramDone,
            SimEvent::RequestComplete(_) => SimEventKind::RequestComplete,
        }
    }
}

impl SimEventKind {
    pub const ALL: [SimEventKind; 8] = [
        SimEventKind::RequestArrival,
        SimEventKind::CacheReadComplete,
        SimEventKind::CacheWriteComplete,
        SimEventKind::CacheFlushStart,
        SimEventKind::NandArrayReadDone,
        SimEventKind::NandDmaComplete,
        SimEventKind::NandProgramDone,
        SimEventKind::RequestComplete,
    ];
}
