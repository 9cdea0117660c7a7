//! Size gate applied before any network or browser work.

use crate::error::{IngestError, Result};
use crate::scan::LocalAsset;

/// Reject assets at or above `limit` bytes.
pub fn check_size(asset: &LocalAsset, limit: u64) -> Result<()> {
    if asset.size >= limit {
        return Err(IngestError::SizeLimit {
            size: asset.size,
            limit,
        });
    }
    Ok(())
}
