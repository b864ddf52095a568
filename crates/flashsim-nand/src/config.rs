use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NandConfigError {
    #[error("NAND geometry field {field} must be non-zero")]
    ZeroGeometry { field: &'static str },
}

/// Device geometry and fixed operation latencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NandConfig {
    pub channels: usize,
    pub dies_per_channel: usize,
    pub planes_per_die: usize,
    pub blocks_per_plane: usize,
    pub pages_per_block: usize,
    /// Array sensing time for a page read.
    pub read_us: u64,
    /// Cell programming time for a page write.
    pub program_us: u64,
    /// Channel transfer time for one page.
    pub dma_us: u64,
}

impl Default for NandConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            dies_per_channel: 2,
            planes_per_die: 2,
            blocks_per_plane: 16,
            pages_per_block: 64,
            read_us: 50,
            program_us: 200,
            dma_us: 5,
        }
    }
}

impl NandConfig {
    pub fn validate(&self) -> Result<(), NandConfigError> {
        for (field, value) in [
            ("channels", self.channels),
            ("dies_per_channel", self.dies_per_channel),
            ("planes_per_die", self.planes_per_die),
            ("blocks_per_plane", self.blocks_per_plane),
            ("pages_per_block", self.pages_per_block),
        ] {
            if value == 0 {
                return Err(NandConfigError::ZeroGeometry { field });
            }
        }
        Ok(())
    }

    pub fn num_dies(&self) -> usize {
        self.channels * self.dies_per_channel
    }
}
