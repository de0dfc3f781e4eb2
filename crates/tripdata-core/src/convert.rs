//! Columnar-to-row conversion seam.
//!
//! Months published in the columnar era must be converted to the canonical
//! flat format after download. The decode itself is delegated behind this
//! trait; the engine only depends on the contract.

use anyhow::Result;
use std::path::Path;

/// Converts a columnar file at `src` into an equivalent flat-row file at
/// `dest`. Implementations must either produce a complete `dest` or fail
/// with no partial output.
pub trait ColumnarConverter: Send + Sync {
    fn convert(&self, src: &Path, dest: &Path) -> Result<()>;
}

/// Used when no converter backend is wired in. Always fails, which the fetch
/// pipeline records as zero bytes retained for columnar targets.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoConverter;

impl ColumnarConverter for NoConverter {
    fn convert(&self, src: &Path, _dest: &Path) -> Result<()> {
        anyhow::bail!(
            "no columnar converter available for {}",
            src.display()
        );
    }
}
