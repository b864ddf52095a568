use flashsim_cache::{CacheConfig, CacheConfigError};
use flashsim_events::HandlerCollision;
use flashsim_ftl::{FtlConfig, FtlConfigError};
use flashsim_nand::{NandConfig, NandConfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("NCQ size must be non-zero")]
    ZeroNcqSize,
    #[error(transparent)]
    Nand(#[from] NandConfigError),
    #[error(transparent)]
    Cache(#[from] CacheConfigError),
    #[error(transparent)]
    Ftl(#[from] FtlConfigError),
    #[error(transparent)]
    HandlerCollision(#[from] HandlerCollision),
}

/// Full device configuration. The defaults model a small two-channel,
/// two-die-per-channel drive with a two-page write cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulatorConfig {
    /// Native command queue depth.
    pub ncq_size: usize,
    pub cache: CacheConfig,
    pub nand: NandConfig,
    pub ftl: FtlConfig,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            ncq_size: 32,
            cache: CacheConfig::default(),
            nand: NandConfig::default(),
            ftl: FtlConfig::default(),
        }
    }
}

impl SimulatorConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if self.ncq_size == 0 {
            return Err(SimError::ZeroNcqSize);
        }
        self.nand.validate()?;
        self.cache.validate()?;
        self.ftl.validate()?;
        Ok(())
    }
}
