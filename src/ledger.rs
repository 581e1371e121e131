use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::collections::{Bst, ChainingHashTable};
use crate::limits::*;
use crate::model::{Category, LedgerEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    DuplicateId(Ulid),
    InvalidArgument(&'static str),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for LedgerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerError::DuplicateId(id) => write!(f, "duplicate ledger entry: {id}"),
            LedgerError::InvalidArgument(msg) => write!(f, "invalid ledger entry: {msg}"),
            LedgerError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for LedgerError {}

type DateOrder = fn(&&LedgerEntry, &&LedgerEntry) -> Ordering;

/// Date first, id second: a strict total order over distinct entries.
fn by_date_then_id(a: &&LedgerEntry, b: &&LedgerEntry) -> Ordering {
    a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id))
}

/// Append-only store of financial records with hash indexes by owner,
/// category and correlation id.
///
/// Sorted views are materialised on demand by loading the current entries
/// into a fresh [`Bst`], so appends never pay for ordering.
#[derive(Debug, Default)]
pub struct TransactionLedger {
    entries: Vec<LedgerEntry>,
    by_id: ChainingHashTable<Ulid, usize>,
    by_owner: ChainingHashTable<String, Vec<usize>>,
    by_category: ChainingHashTable<Category, Vec<usize>>,
    /// Last write wins when correlation ids repeat.
    by_correlation: ChainingHashTable<String, usize>,
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a ledger from scratch; fails on the first invalid entry.
    pub fn from_entries(entries: impl IntoIterator<Item = LedgerEntry>) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for entry in entries {
            ledger.append(entry)?;
        }
        Ok(ledger)
    }

    /// Check an entry against the ledger without storing it.
    pub fn validate(&self, entry: &LedgerEntry) -> Result<(), LedgerError> {
        if entry.owner_id.is_empty() {
            return Err(LedgerError::InvalidArgument("owner id is empty"));
        }
        if entry.owner_id.len() > MAX_OWNER_ID_LEN {
            return Err(LedgerError::LimitExceeded("owner id too long"));
        }
        if entry.amount.is_sign_negative() {
            return Err(LedgerError::InvalidArgument("amount is negative"));
        }
        if entry.note.len() > MAX_NOTE_LEN {
            return Err(LedgerError::LimitExceeded("note too long"));
        }
        if let Some(correlation) = &entry.correlation_id
            && correlation.len() > MAX_CORRELATION_ID_LEN {
                return Err(LedgerError::LimitExceeded("correlation id too long"));
            }
        if self.by_id.contains_key(&entry.id) {
            return Err(LedgerError::DuplicateId(entry.id));
        }
        Ok(())
    }

    /// Store `entry` and update every index, or change nothing on error.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), LedgerError> {
        self.validate(&entry)?;

        let pos = self.entries.len();
        self.by_id.put(entry.id, pos);
        self.by_owner
            .get_or_insert_with(entry.owner_id.clone(), Vec::new)
            .push(pos);
        self.by_category
            .get_or_insert_with(entry.category, Vec::new)
            .push(pos);
        if let Some(correlation) = entry.correlation_id.as_ref().filter(|c| !c.is_empty()) {
            self.by_correlation.put(correlation.clone(), pos);
        }
        self.entries.push(entry);
        Ok(())
    }

    /// Replace the whole ledger (storage changed underneath). On error the
    /// current contents stay in place.
    pub fn reload(&mut self, entries: impl IntoIterator<Item = LedgerEntry>) -> Result<(), LedgerError> {
        let fresh = Self::from_entries(entries)?;
        *self = fresh;
        tracing::debug!(entries = self.entries.len(), "ledger reloaded");
        Ok(())
    }

    fn resolve(&self, positions: Option<&Vec<usize>>) -> Vec<&LedgerEntry> {
        positions
            .map(|ps| ps.iter().map(|&p| &self.entries[p]).collect())
            .unwrap_or_default()
    }

    pub fn get(&self, id: Ulid) -> Option<&LedgerEntry> {
        self.by_id.get(&id).map(|&p| &self.entries[p])
    }

    /// Entries for one owner in append order.
    pub fn by_owner(&self, owner_id: &str) -> Vec<&LedgerEntry> {
        self.resolve(self.by_owner.get(owner_id))
    }

    pub fn by_category(&self, category: Category) -> Vec<&LedgerEntry> {
        self.resolve(self.by_category.get(&category))
    }

    /// At most one entry; the most recent one if several share the id.
    pub fn by_correlation_id(&self, correlation_id: &str) -> Option<&LedgerEntry> {
        if correlation_id.is_empty() {
            return None;
        }
        self.by_correlation
            .get(correlation_id)
            .map(|&p| &self.entries[p])
    }

    /// Entries in append order.
    pub fn iter(&self) -> impl Iterator<Item = &LedgerEntry> {
        self.entries.iter()
    }

    fn date_tree(&self) -> Bst<&LedgerEntry, DateOrder> {
        let mut tree: Bst<&LedgerEntry, DateOrder> = Bst::new(by_date_then_id);
        for entry in &self.entries {
            tree.insert(entry);
        }
        tree
    }

    /// Snapshot ordered by (date, id). O(n log n) per call.
    pub fn all_entries_date_ordered(&self) -> Vec<&LedgerEntry> {
        self.date_tree().in_order()
    }

    /// Entries dated within `[from, to]`, ordered by (date, id).
    pub fn entries_between(&self, from: NaiveDate, to: NaiveDate) -> Vec<&LedgerEntry> {
        self.date_tree().range_by(|entry| {
            if entry.date < from {
                Ordering::Less
            } else if entry.date > to {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        })
    }

    pub fn earliest(&self) -> Option<&LedgerEntry> {
        self.date_tree().find_min().copied()
    }

    pub fn latest(&self) -> Option<&LedgerEntry> {
        self.date_tree().find_max().copied()
    }

    pub fn total_for_owner(&self, owner_id: &str) -> Decimal {
        self.by_owner(owner_id).iter().map(|e| e.amount).sum()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
