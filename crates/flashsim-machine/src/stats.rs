use serde::Serialize;

/// Aggregate device counters for one simulation run.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct Stats {
    /// Pages read from the NAND array (host reads + RMW merge reads).
    pub nand_reads: u64,
    /// Pages programmed to the NAND array.
    pub nand_writes: u64,
    /// Host READ requests in the trace.
    pub host_reads: u64,
    /// Host WRITE requests in the trace (logical writes).
    pub host_writes: u64,
    /// Host READs served from the write cache.
    pub cache_read_hits: u64,
    /// LBAs per physical page, for the amplification calculation.
    pub lbas_per_page: u64,
}

impl Stats {
    /// Fraction of host reads served from the cache.
    pub fn cache_hit_rate(&self) -> Option<f64> {
        if self.host_reads == 0 {
            return None;
        }
        Some(self.cache_read_hits as f64 / self.host_reads as f64)
    }

    /// LBAs physically written per LBA logically written.
    pub fn write_amplification(&self) -> Option<f64> {
        if self.host_writes == 0 {
            return None;
        }
        Some((self.nand_writes * self.lbas_per_page) as f64 / self.host_writes as f64)
    }
}
