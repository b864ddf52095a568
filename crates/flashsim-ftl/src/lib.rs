//! Thin flash-translation-layer stub.
//!
//! The request-lifecycle core consumes exactly three operations:
//! `lba_to_lpa`, `lpa_to_ppa` and `allocate`. Wear leveling, garbage
//! collection and real allocation policy are out of scope; the allocator
//! here hands out physical pages striped across channels first and dies
//! second, so back-to-back writebacks land on independent resources.

use std::collections::HashMap;

use flashsim_core::{Lba, Lpa, PhysicalAddress};
use flashsim_nand::NandConfig;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FtlConfigError {
    #[error("lbas_per_page must be non-zero")]
    ZeroLbasPerPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FtlConfig {
    /// How many logical blocks share one physical page.
    pub lbas_per_page: u64,
}

impl Default for FtlConfig {
    fn default() -> Self {
        Self { lbas_per_page: 2 }
    }
}

impl FtlConfig {
    pub fn validate(&self) -> Result<(), FtlConfigError> {
        if self.lbas_per_page == 0 {
            return Err(FtlConfigError::ZeroLbasPerPage);
        }
        Ok(())
    }
}

/// Page-mapped FTL with a bump allocator over the NAND geometry.
pub struct Ftl {
    cfg: FtlConfig,
    geometry: NandConfig,
    mapping: HashMap<Lpa, PhysicalAddress>,
    next_slot: u64,
}

impl Ftl {
    pub fn new(cfg: FtlConfig, geometry: NandConfig) -> Result<Self, FtlConfigError> {
        cfg.validate()?;
        Ok(Self {
            cfg,
            geometry,
            mapping: HashMap::new(),
            next_slot: 0,
        })
    }

    pub fn lbas_per_page(&self) -> u64 {
        self.cfg.lbas_per_page
    }

    pub fn lba_to_lpa(&self, lba: Lba) -> Lpa {
        Lpa(lba.0 / self.cfg.lbas_per_page)
    }

    /// Current mapping for a logical page, if it was ever written.
    pub fn lpa_to_ppa(&self, lpa: Lpa) -> Option<PhysicalAddress> {
        self.mapping.get(&lpa).copied()
    }

    /// Reserves a fresh physical page for `lpa` and updates the mapping.
    /// The previous physical page, if any, is implicitly invalidated.
    pub fn allocate(&mut self, lpa: Lpa) -> PhysicalAddress {
        let pa = self.next_physical_page();
        self.mapping.insert(lpa, pa);
        pa
    }

    /// Seeds a mapping directly, for trace warm-up and tests modeling
    /// previously-written data.
    pub fn preload(&mut self, lpa: Lpa, pa: PhysicalAddress) {
        self.mapping.insert(lpa, pa);
    }

    fn next_physical_page(&mut self) -> PhysicalAddress {
        let g = &self.geometry;
        let channels = g.channels as u64;
        let dies = g.dies_per_channel as u64;
        let pages_per_die =
            g.planes_per_die as u64 * g.blocks_per_plane as u64 * g.pages_per_block as u64;

        let slot = self.next_slot;
        assert!(
            slot < channels * dies * pages_per_die,
            "physical pages exhausted after {slot} allocations"
        );
        self.next_slot += 1;

        // Stripe across channels, then dies, then fill pages within a die.
        let channel = slot % channels;
        let die = (slot / channels) % dies;
        let within_die = slot / (channels * dies);
        let page = within_die % g.pages_per_block as u64;
        let block_linear = within_die / g.pages_per_block as u64;
        let block = block_linear % g.blocks_per_plane as u64;
        let plane = block_linear / g.blocks_per_plane as u64;

        PhysicalAddress {
            channel: channel as u32,
            die: die as u32,
            plane: plane as u32,
            block: block as u32,
            page: page as u32,
        }
    }
}
