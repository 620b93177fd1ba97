use std::path::Path;

use serde_json::Value;
use tracing::{debug, warn};

use crate::digest::{absorb_digest, DigestMap, WeekId};
use crate::error::{AppError, Result};
use crate::models::WeeklyDigest;

/// Load the persisted digest snapshot. A missing file is an empty map.
pub fn load_digests(path: &Path) -> Result<DigestMap> {
    if !path.exists() {
        debug!(path = %path.display(), "No digest state yet");
        return Ok(DigestMap::new());
    }
    let content = std::fs::read_to_string(path)?;
    digests_from_json(&content)
}

/// Write the snapshot via a temporary file so a crash never leaves half a file.
pub fn save_digests(path: &Path, digests: &DigestMap) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(digests)?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)?;
    std::fs::rename(&tmp, path)?;
    debug!(path = %path.display(), digests = digests.len(), "Saved digest state");
    Ok(())
}

/// Parse a snapshot. The top level must be an object keyed by week.
///
/// Keys are re-derived from each digest's week, so snapshots written with
/// unpadded keys (`2026-W4`) come back as `2026-W04`. Two entries landing on
/// the same week are combined rather than overwritten.
pub fn digests_from_json(json: &str) -> Result<DigestMap> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Object(entries) = value else {
        return Err(AppError::InvalidInput(
            "digest state must be a JSON object keyed by week".to_string(),
        ));
    };

    let mut digests = DigestMap::new();
    for (key, entry) in entries {
        let mut digest: WeeklyDigest = serde_json::from_value(entry)?;
        let week = match WeekId::new(digest.week_number, digest.year) {
            Ok(week) => week,
            Err(_) => key.parse::<WeekId>()?,
        };
        if week.key() != key {
            warn!(from = %key, to = %week.key(), "Re-keying digest");
        }
        digest.id = week.key();
        match digests.get_mut(&digest.id) {
            Some(existing) => {
                warn!(week = %digest.id, from = %key, "Combining duplicate digest entries");
                absorb_digest(existing, digest);
            }
            None => {
                digests.insert(week.key(), digest);
            }
        }
    }
    Ok(digests)
}
