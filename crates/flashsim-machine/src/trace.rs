use flashsim_core::RequestKind;
use serde::{Deserialize, Serialize};

/// One entry of an input trace: what the host asks for, and when.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceRequest {
    #[serde(rename = "op")]
    pub kind: RequestKind,
    /// Target LBA; ignored for flushes.
    #[serde(default)]
    pub lba: u64,
    /// Earliest simulated time the request may enter the NCQ.
    #[serde(rename = "at", default)]
    pub ready_time_us: u64,
    #[serde(default)]
    pub fua: bool,
}

impl TraceRequest {
    pub fn read(lba: u64, ready_time_us: u64) -> Self {
        Self {
            kind: RequestKind::Read,
            lba,
            ready_time_us,
            fua: false,
        }
    }

    pub fn write(lba: u64, ready_time_us: u64) -> Self {
        Self {
            kind: RequestKind::Write,
            lba,
            ready_time_us,
            fua: false,
        }
    }

    pub fn write_fua(lba: u64, ready_time_us: u64) -> Self {
        Self {
            fua: true,
            ..Self::write(lba, ready_time_us)
        }
    }

    pub fn flush(ready_time_us: u64) -> Self {
        Self {
            kind: RequestKind::Flush,
            lba: 0,
            ready_time_us,
            fua: false,
        }
    }
}
