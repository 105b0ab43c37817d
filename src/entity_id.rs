use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::domain::entity_class::EntityClass;

/// Short ids such as `us-3f9a`, widened by four hex characters each time
/// a round of candidates keeps colliding.
pub fn generate_entity_id<F>(class: EntityClass, mut exists: F) -> Result<String, rusqlite::Error>
where
    F: FnMut(&str) -> Result<bool, rusqlite::Error>,
{
    let prefix = class.id_prefix();
    let mut width = 4;

    loop {
        for _ in 0..64 {
            let seed = Uuid::now_v7().to_string();
            let mut hasher = Sha256::new();
            hasher.update(seed.as_bytes());
            let digest = format!("{:x}", hasher.finalize());
            let candidate = format!("{}-{}", prefix, &digest[..width]);
            if !exists(&candidate)? {
                return Ok(candidate);
            }
        }
        width = (width + 4).min(64);
    }
}

pub fn normalize_entity_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_ascii_lowercase())
    }
}
