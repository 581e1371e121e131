mod allocator;
mod availability;
mod conflict;
mod error;
mod mutations;
mod queries;

pub use allocator::{ReleaseOutcome, ReservationAllocator, SlotRelease};
pub use availability::{
    free_slot_starts, free_spans, merge_overlapping, occupied_spans, subtract_intervals,
};
pub use error::EngineError;
pub use mutations::BillingReport;

use std::path::Path;

use tracing::{info, warn};

use crate::index::ResourceIndex;
use crate::ledger::{LedgerError, TransactionLedger};
use crate::model::*;
use crate::wal::Journal;

impl From<LedgerError> for EngineError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::DuplicateId(id) => EngineError::AlreadyExists(id),
            LedgerError::InvalidArgument(msg) => EngineError::InvalidArgument(msg),
            LedgerError::LimitExceeded(msg) => EngineError::LimitExceeded(msg),
        }
    }
}

/// The booking context: resource catalogue, reservation intervals, ledger
/// and (optionally) the journal that makes them durable.
///
/// Every mutation validates and plans against memory, appends its event to
/// the journal, then applies the same event. A journal failure therefore
/// leaves memory untouched.
pub struct BookingEngine {
    pub(super) resources: ResourceIndex,
    pub(super) allocator: ReservationAllocator,
    pub(super) ledger: TransactionLedger,
    pub(super) journal: Option<Journal>,
}

/// Apply one event to the in-memory state.
fn apply_event(
    allocator: &mut ReservationAllocator,
    ledger: &mut TransactionLedger,
    event: Event,
) -> Result<(), EngineError> {
    match event {
        Event::ReservationCreated { reservation } => allocator.insert(reservation),
        Event::ReservationReleased { id } => {
            if allocator.release(id).is_none() {
                warn!(%id, "release of unknown or inactive reservation ignored");
            }
            Ok(())
        }
        Event::SlotReleased {
            released,
            fragments,
        } => allocator.apply_release(released, fragments).map(|_| ()),
        Event::LedgerAppended { entry } => ledger.append(entry).map_err(EngineError::from),
    }
}

impl BookingEngine {
    /// An engine without a journal; state lives for the process only.
    pub fn in_memory() -> Self {
        Self {
            resources: ResourceIndex::new(),
            allocator: ReservationAllocator::new(),
            ledger: TransactionLedger::new(),
            journal: None,
        }
    }

    /// Open the journal at `path` and rebuild state from it.
    ///
    /// Records that no longer apply cleanly (overlaps, duplicates) are
    /// skipped with a warning rather than aborting the load.
    pub fn open(path: &Path) -> Result<Self, EngineError> {
        let (journal, events) =
            Journal::open(path).map_err(|e| EngineError::WalError(e.to_string()))?;
        let mut engine = Self {
            journal: Some(journal),
            ..Self::in_memory()
        };

        let total = events.len();
        let mut skipped = 0usize;
        for event in events {
            if let Err(e) = apply_event(&mut engine.allocator, &mut engine.ledger, event) {
                warn!(error = %e, "skipping journal record");
                skipped += 1;
            }
        }
        info!(
            path = %path.display(),
            records = total,
            skipped,
            reservations = engine.allocator.len(),
            ledger_entries = engine.ledger.len(),
            "journal replayed"
        );
        Ok(engine)
    }

    /// Journal `event` (if durable), then apply it.
    pub(super) fn persist_and_apply(&mut self, event: Event) -> Result<(), EngineError> {
        if let Some(journal) = self.journal.as_mut() {
            let started = std::time::Instant::now();
            journal
                .append(&event)
                .map_err(|e| EngineError::WalError(e.to_string()))?;
            metrics::histogram!(crate::observability::JOURNAL_APPEND_DURATION_SECONDS)
                .record(started.elapsed().as_secs_f64());
        }
        apply_event(&mut self.allocator, &mut self.ledger, event)
    }

    pub fn resources(&self) -> &ResourceIndex {
        &self.resources
    }

    pub fn allocator(&self) -> &ReservationAllocator {
        &self.allocator
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub fn is_durable(&self) -> bool {
        self.journal.is_some()
    }

    /// Events that recreate the current state: every reservation (Released
    /// ones included, for history) followed by every ledger entry.
    pub fn snapshot_events(&self) -> Vec<Event> {
        snapshot_of(&self.allocator, &self.ledger)
    }

    /// Journal records beyond what a fresh snapshot would hold.
    pub fn stale_journal_records(&self) -> u64 {
        let live = (self.allocator.len() + self.ledger.len()) as u64;
        self.journal
            .as_ref()
            .map_or(0, |j| j.records().saturating_sub(live))
    }

    /// Rewrite the journal as a snapshot of the current state. No-op without
    /// a journal.
    pub fn compact(&mut self) -> Result<(), EngineError> {
        let events = self.snapshot_events();
        let Some(journal) = self.journal.as_mut() else {
            return Ok(());
        };
        journal
            .compact(&events)
            .map_err(|e| EngineError::WalError(e.to_string()))?;
        metrics::counter!(crate::observability::JOURNAL_COMPACTIONS_TOTAL).increment(1);
        info!(records = events.len(), "journal compacted");
        Ok(())
    }
}

fn snapshot_of(allocator: &ReservationAllocator, ledger: &TransactionLedger) -> Vec<Event> {
    let mut events = Vec::with_capacity(allocator.len() + ledger.len());
    events.extend(
        allocator
            .all()
            .map(|r| Event::ReservationCreated { reservation: r.clone() }),
    );
    events.extend(
        ledger
            .iter()
            .map(|e| Event::LedgerAppended { entry: e.clone() }),
    );
    events
}
