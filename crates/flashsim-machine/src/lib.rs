//! The simulator harness: wires the event queue, frontend scheduler,
//! write cache, FTL and NAND together, drives the dispatch loop, and
//! collects per-request traces and device statistics.
//!
//! Construction mirrors a hardware controller bring-up: every component
//! is built from its config section, and each event kind is claimed by
//! exactly one handler in the registry. At runtime the loop pops one
//! event, routes it, then re-runs both schedulers, the way a controller
//! re-evaluates readiness whenever a resource frees.

mod config;
mod frontend;
mod sim;
mod stats;
mod trace;

pub use config::{SimError, SimulatorConfig};
pub use frontend::FrontendScheduler;
pub use sim::{SimReport, Simulator};
pub use stats::Stats;
pub use trace::TraceRequest;

pub use flashsim_cache::{CacheConfig, PageState};
pub use flashsim_core::{
    Lba, Lpa, PhysicalAddress, Request, RequestFlags, RequestId, RequestKind, RequestStatus,
    Stage,
};
pub use flashsim_ftl::FtlConfig;
pub use flashsim_nand::NandConfig;
