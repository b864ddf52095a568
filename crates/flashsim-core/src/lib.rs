//! Shared leaf types for the SSD simulator: address and id newtypes, the
//! host request with its lifecycle trace, and the closed event union the
//! components communicate through.

mod addr;
mod event;
mod request;

pub use addr::{ChannelId, Lba, Lpa, PhysicalAddress};
pub use event::{SimEvent, SimEventKind, TxnId};
pub use request::{
    Request, RequestFlags, RequestId, RequestKind, RequestStatus, RequestStore, Stage,
    StageTrace,
};
