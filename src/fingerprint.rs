use sha2::{Digest, Sha256};

use crate::models::LookupKind;

// hex chars kept from the digest, enough to tell queries apart in logs
const FINGERPRINT_LEN: usize = 12;

// Short hash of a lookup query (kind + digits) so logs never carry the number itself
pub fn query_fingerprint(kind: LookupKind, query: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str());
    hasher.update(query);
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(FINGERPRINT_LEN);
    hex
}
