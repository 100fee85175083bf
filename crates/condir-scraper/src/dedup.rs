//! Cross-page duplicate suppression for one harvest session.

use std::collections::HashSet;

use condir_core::{DedupStrategy, ListingRecord};

#[derive(Debug, Default)]
pub struct Deduplicator {
    strategy: DedupStrategy,
    seen: HashSet<String>,
}

impl Deduplicator {
    #[must_use]
    pub fn new(strategy: DedupStrategy) -> Self {
        Self {
            strategy,
            seen: HashSet::new(),
        }
    }

    /// Identity of `record` under the configured strategy.
    ///
    /// The composite key is `name + "_" + address`, with absent parts read
    /// as empty. Under [`DedupStrategy::ExternalId`] a payload id wins when
    /// present.
    #[must_use]
    pub fn key(&self, record: &ListingRecord) -> String {
        if self.strategy == DedupStrategy::ExternalId {
            if let Some(id) = &record.external_id {
                return format!("id:{id}");
            }
        }
        format!(
            "{}_{}",
            record.name.as_deref().unwrap_or_default(),
            record.address.as_deref().unwrap_or_default()
        )
    }

    /// Record `record` as seen. Returns `false` if its key was already seen.
    pub fn accept(&mut self, record: &ListingRecord) -> bool {
        let key = self.key(record);
        self.seen.insert(key)
    }

    /// Distinct keys accepted so far.
    #[must_use]
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, address: Option<&str>) -> ListingRecord {
        ListingRecord {
            name: Some(name.to_string()),
            address: address.map(ToString::to_string),
            ..ListingRecord::default()
        }
    }

    #[test]
    fn accepts_first_and_rejects_repeat() {
        let mut dedup = Deduplicator::default();
        assert!(dedup.accept(&record("Summit Roofing", Some("Brooklyn, NY"))));
        assert!(!dedup.accept(&record("Summit Roofing", Some("Brooklyn, NY"))));
        assert_eq!(dedup.seen_count(), 1);
    }

    #[test]
    fn same_name_different_address_is_distinct() {
        let mut dedup = Deduplicator::default();
        assert!(dedup.accept(&record("Summit Roofing", Some("Brooklyn, NY"))));
        assert!(dedup.accept(&record("Summit Roofing", Some("Queens, NY"))));
    }

    #[test]
    fn missing_address_keys_as_empty() {
        let dedup = Deduplicator::default();
        assert_eq!(dedup.key(&record("Summit Roofing", None)), "Summit Roofing_");
        let mut dedup = dedup;
        assert!(dedup.accept(&record("Summit Roofing", None)));
        assert!(!dedup.accept(&record("Summit Roofing", Some(""))));
    }

    #[test]
    fn external_id_strategy_uses_payload_id() {
        let mut dedup = Deduplicator::new(DedupStrategy::ExternalId);
        let mut a = record("Summit Roofing", Some("Brooklyn, NY"));
        a.external_id = Some("991".to_string());
        let mut b = record("Summit Roofing Inc", Some("Brooklyn NY"));
        b.external_id = Some("991".to_string());
        assert_eq!(dedup.key(&a), "id:991");
        assert!(dedup.accept(&a));
        assert!(!dedup.accept(&b));
    }

    #[test]
    fn external_id_strategy_falls_back_to_composite() {
        let dedup = Deduplicator::new(DedupStrategy::ExternalId);
        assert_eq!(
            dedup.key(&record("Summit Roofing", Some("Brooklyn, NY"))),
            "Summit Roofing_Brooklyn, NY"
        );
    }
}
