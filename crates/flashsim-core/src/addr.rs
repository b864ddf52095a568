use std::fmt;

use serde::Serialize;

/// Logical block address: the host-visible sector index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Lba(pub u64);

/// Logical page address: `lba / lbas_per_page`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Lpa(pub u64);

/// Index of a NAND channel's DMA engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChannelId(pub usize);

impl fmt::Display for Lba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lba{}", self.0)
    }
}

impl fmt::Display for Lpa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lpa{}", self.0)
    }
}

/// NAND coordinates. Opaque to the request-lifecycle core apart from the
/// channel/die pair, which drives resource arbitration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct PhysicalAddress {
    pub channel: u32,
    pub die: u32,
    pub plane: u32,
    pub block: u32,
    pub page: u32,
}

impl PhysicalAddress {
    pub fn channel_id(&self) -> ChannelId {
        ChannelId(self.channel as usize)
    }
}

impl fmt::Display for PhysicalAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ch{}/die{}/pl{}/blk{}/pg{}",
            self.channel, self.die, self.plane, self.block, self.page
        )
    }
}
