use std::collections::BTreeMap;

use crate::collections::ChainingHashTable;
use crate::model::ResourceRecord;

/// Type filter value that matches every resource type.
pub const ANY_TYPE: &str = "All";

/// Resource catalogue grouped as site → floor → records.
///
/// Rebuilt wholesale from a flat list on every load; there is no incremental
/// update. Sites and floors iterate in label order.
#[derive(Debug, Default)]
pub struct ResourceIndex {
    sites: BTreeMap<String, BTreeMap<String, Vec<ResourceRecord>>>,
    /// Public resource code → (site, floor, position in the floor list).
    by_code: ChainingHashTable<String, (String, String, usize)>,
    len: usize,
}

impl ResourceIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ResourceRecord>) -> Self {
        let mut index = Self::new();
        index.build_index(records);
        index
    }

    /// Replace the whole index. Records keep their input order within a floor.
    /// A later record with an already-seen resource code shadows the earlier
    /// one for code lookups.
    pub fn build_index(&mut self, records: impl IntoIterator<Item = ResourceRecord>) {
        let mut sites: BTreeMap<String, BTreeMap<String, Vec<ResourceRecord>>> = BTreeMap::new();
        let mut by_code = ChainingHashTable::new();
        let mut len = 0;
        for record in records {
            let floor = sites
                .entry(record.site_label.clone())
                .or_default()
                .entry(record.floor_label.clone())
                .or_default();
            by_code.put(
                record.resource_id.clone(),
                (record.site_label.clone(), record.floor_label.clone(), floor.len()),
            );
            floor.push(record);
            len += 1;
        }
        self.sites = sites;
        self.by_code = by_code;
        self.len = len;
        tracing::debug!(resources = len, sites = self.sites.len(), "resource index rebuilt");
    }

    pub fn sites(&self) -> impl Iterator<Item = &str> {
        self.sites.keys().map(String::as_str)
    }

    /// Floor labels present for `site`; empty for an unknown site.
    pub fn floors(&self, site: &str) -> Vec<String> {
        self.sites
            .get(site)
            .map(|floors| floors.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Records on one floor, in load order. Empty when unknown.
    pub fn by_location(&self, site: &str, floor: &str) -> Vec<ResourceRecord> {
        self.floor_slice(site, floor).to_vec()
    }

    fn floor_slice(&self, site: &str, floor: &str) -> &[ResourceRecord] {
        self.sites
            .get(site)
            .and_then(|floors| floors.get(floor))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Records on one floor matching every predicate.
    ///
    /// `kind` of `None` or `"All"` matches any type; otherwise the match is
    /// case-insensitive. `only_available` keeps records whose stored status
    /// is Available.
    pub fn filter(
        &self,
        site: &str,
        floor: &str,
        kind: Option<&str>,
        min_capacity: u32,
        only_available: bool,
    ) -> Vec<ResourceRecord> {
        let kind = kind.filter(|k| !k.eq_ignore_ascii_case(ANY_TYPE));
        self.floor_slice(site, floor)
            .iter()
            .filter(|r| kind.is_none_or(|k| r.kind.eq_ignore_ascii_case(k)))
            .filter(|r| r.capacity >= min_capacity)
            .filter(|r| !only_available || r.is_available())
            .cloned()
            .collect()
    }

    /// Look up a record by its public resource code.
    pub fn get(&self, resource_code: &str) -> Option<&ResourceRecord> {
        let (site, floor, pos) = self.by_code.get(resource_code)?;
        self.floor_slice(site, floor).get(*pos)
    }

    /// Every record, grouped by site then floor.
    pub fn all(&self) -> impl Iterator<Item = &ResourceRecord> {
        self.sites.values().flat_map(|floors| floors.values().flatten())
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ResourceStatus;
    use rust_decimal::Decimal;

    fn record(code: &str, site: &str, floor: &str, kind: &str, capacity: u32) -> ResourceRecord {
        ResourceRecord {
            id: code.to_lowercase(),
            name: format!("{kind} {code}"),
            floor_label: floor.into(),
            resource_id: code.into(),
            kind: kind.into(),
            site_label: site.into(),
            capacity,
            status: ResourceStatus::Available,
            rate_per_hour: Decimal::new(1000, 2),
        }
    }

    fn sample() -> ResourceIndex {
        let mut maintenance = record("A-01-03", "A", "1F", "Room", 8);
        maintenance.status = ResourceStatus::Maintenance;
        ResourceIndex::from_records(vec![
            record("A-01-01", "A", "1F", "Desk", 1),
            record("A-01-02", "A", "1F", "Room", 6),
            maintenance,
            record("A-02-01", "A", "2F", "Desk", 1),
            record("B-01-01", "B", "1F", "Booth", 2),
        ])
    }

    #[test]
    fn groups_by_site_and_floor() {
        let index = sample();
        assert_eq!(index.len(), 5);
        assert_eq!(index.sites().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(index.floors("A"), vec!["1F".to_string(), "2F".to_string()]);
        assert_eq!(index.floors("B"), vec!["1F".to_string()]);
        assert!(index.floors("Z").is_empty());

        let codes: Vec<_> = index
            .by_location("A", "1F")
            .into_iter()
            .map(|r| r.resource_id)
            .collect();
        assert_eq!(codes, vec!["A-01-01", "A-01-02", "A-01-03"]);
        assert!(index.by_location("A", "9F").is_empty());
    }

    #[test]
    fn filter_predicates() {
        let index = sample();
        let codes = |v: Vec<ResourceRecord>| v.into_iter().map(|r| r.resource_id).collect::<Vec<_>>();

        assert_eq!(codes(index.filter("A", "1F", None, 0, false)).len(), 3);
        assert_eq!(codes(index.filter("A", "1F", Some("All"), 0, false)).len(), 3);
        assert_eq!(codes(index.filter("A", "1F", Some("all"), 0, false)).len(), 3);
        assert_eq!(
            codes(index.filter("A", "1F", Some("room"), 0, false)),
            vec!["A-01-02", "A-01-03"]
        );
        assert_eq!(codes(index.filter("A", "1F", Some("Room"), 0, true)), vec!["A-01-02"]);
        assert_eq!(codes(index.filter("A", "1F", None, 7, false)), vec!["A-01-03"]);
        assert!(index.filter("A", "1F", None, 7, true).is_empty());
        assert!(index.filter("C", "1F", None, 0, false).is_empty());
    }

    #[test]
    fn code_lookup() {
        let index = sample();
        assert_eq!(index.get("A-02-01").unwrap().floor_label, "2F");
        assert_eq!(index.get("B-01-01").unwrap().kind, "Booth");
        assert!(index.get("Z-00-00").is_none());
    }

    #[test]
    fn rebuild_replaces_everything() {
        let mut index = sample();
        index.build_index(vec![record("C-05-01", "C", "5F", "Desk", 1)]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.sites().collect::<Vec<_>>(), vec!["C"]);
        assert!(index.get("A-01-01").is_none());
        assert!(index.get("C-05-01").is_some());

        index.build_index(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.all().count(), 0);
    }

    #[test]
    fn returned_lists_are_copies() {
        let index = sample();
        let mut list = index.by_location("A", "1F");
        list.clear();
        assert_eq!(index.by_location("A", "1F").len(), 3);
    }
}
