use sha2::{Digest, Sha256};

/// Builds the canonical cache key for `(domain, op, request)`.
///
/// Key layout is `domain:op:<hash>` where the hash covers the request fields
/// in stable (sorted) order, so the same request always lands on the same
/// entry and a whole domain can be dropped by prefix after a write.
pub fn fingerprint(domain: &str, op: &str, fields: &[(&str, String)]) -> String {
    let mut sorted: Vec<&(&str, String)> = fields.iter().collect();
    sorted.sort_by_key(|(name, _)| *name);

    let mut hasher = Sha256::new();
    for (name, value) in sorted {
        hasher.update(name.as_bytes());
        hasher.update([0x1f]);
        hasher.update(value.as_bytes());
        hasher.update([0x1e]);
    }
    let digest = hasher.finalize();
    format!("{domain}:{op}:{}", hex::encode(&digest[..16]))
}

/// Invalidation prefix covering every cached read of a domain.
pub fn domain_prefix(domain: &str) -> String {
    format!("{domain}:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_order_is_irrelevant() {
        let a = fingerprint(
            "withdraw",
            "find_all",
            &[("page", "1".into()), ("page_size", "10".into())],
        );
        let b = fingerprint(
            "withdraw",
            "find_all",
            &[("page_size", "10".into()), ("page", "1".into())],
        );
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_requests_differ() {
        let a = fingerprint("withdraw", "find_all", &[("page", "1".into())]);
        let b = fingerprint("withdraw", "find_all", &[("page", "2".into())]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_keys_live_under_domain_prefix() {
        let key = fingerprint("card", "find_by_id", &[("id", "7".into())]);
        assert!(key.starts_with(&domain_prefix("card")));
    }
}
