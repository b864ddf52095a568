//! NAND back end: fixed geometry, per-die busy state, per-channel DMA
//! engines, and the transaction scheduler that serializes work against
//! them.
//!
//! The backend is a passive state machine driven by the event queue. A
//! read senses the array (`read_us`), then transfers over the channel
//! (`dma_us`); a write transfers first, then programs (`program_us`).
//! The die is held busy for the whole operation; the channel only for
//! the transfer.

mod backend;
mod config;
mod sched;
mod txn;

pub use backend::NandBackend;
pub use config::{NandConfig, NandConfigError};
pub use sched::NandScheduler;
pub use txn::{NandTransaction, TxnKind, TxnPayload, TxnStatus, TxnStore};
