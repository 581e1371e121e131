use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use ulid::Ulid;

use crate::ledger::TransactionLedger;
use crate::model::*;
use crate::observability::{self, category_label};

use super::{snapshot_of, BookingEngine, EngineError, SlotRelease};

/// Outcome of [`BookingEngine::bill_unbilled`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingReport {
    /// Usage entries appended.
    pub billed: usize,
    /// Active reservations left alone: already billed, or their resource is
    /// not in the catalogue.
    pub skipped: usize,
}

impl BookingEngine {
    /// Replace the resource catalogue. Reservations are untouched.
    pub fn load_resources(&mut self, records: impl IntoIterator<Item = ResourceRecord>) {
        self.resources.build_index(records);
        info!(resources = self.resources.len(), "resource catalogue loaded");
    }

    /// Book `span` of a catalogued resource for `owner_id`, priced at the
    /// resource's current hourly rate.
    pub fn book(
        &mut self,
        owner_id: &str,
        resource_code: &str,
        date: NaiveDate,
        span: Span,
    ) -> Result<Reservation, EngineError> {
        let record = self
            .resources
            .get(resource_code)
            .ok_or_else(|| EngineError::NotFound(format!("resource {resource_code}")))?;
        if record.status == ResourceStatus::Maintenance {
            return Err(EngineError::Unavailable(resource_code.to_string()));
        }
        let rate = record.rate_per_hour;

        let reservation = match self
            .allocator
            .plan_create(owner_id, resource_code, date, span, rate)
        {
            Ok(r) => r,
            Err(e @ EngineError::Conflict(_)) => {
                metrics::counter!(observability::BOOKING_CONFLICTS_TOTAL).increment(1);
                debug!(resource = resource_code, %date, %span, "booking conflict");
                return Err(e);
            }
            Err(e) => return Err(e),
        };

        self.persist_and_apply(Event::ReservationCreated {
            reservation: reservation.clone(),
        })?;
        metrics::counter!(observability::RESERVATIONS_CREATED_TOTAL).increment(1);
        info!(
            id = %reservation.id,
            owner = owner_id,
            resource = resource_code,
            %date,
            %span,
            "reservation created"
        );
        Ok(reservation)
    }

    /// Release a whole reservation. Only its owner may do so; an unknown or
    /// already released id is a no-op.
    pub fn release(&mut self, owner_id: &str, id: Ulid) -> Result<Option<Reservation>, EngineError> {
        let Some(existing) = self.allocator.reservation(id) else {
            return Ok(None);
        };
        if !existing.is_active() {
            return Ok(None);
        }
        if existing.owner_id != owner_id {
            return Err(EngineError::NotOwner {
                reservation: id,
                owner: owner_id.to_string(),
            });
        }

        self.persist_and_apply(Event::ReservationReleased { id })?;
        metrics::counter!(observability::RESERVATIONS_RELEASED_TOTAL).increment(1);
        info!(%id, owner = owner_id, "reservation released");
        Ok(self.allocator.reservation(id).cloned())
    }

    /// Release whichever Active reservation covers `instant`. Nothing
    /// covering it is a no-op.
    pub fn release_at(
        &mut self,
        owner_id: &str,
        resource_code: &str,
        date: NaiveDate,
        instant: Minute,
    ) -> Result<Option<Reservation>, EngineError> {
        if instant >= MINUTES_PER_DAY {
            return Err(EngineError::InvalidArgument("instant is past the end of the day"));
        }
        let Some(id) = self
            .allocator
            .covering_reservation(resource_code, date, instant)
            .map(|r| r.id)
        else {
            debug!(resource = resource_code, %date, instant, "nothing booked at instant");
            return Ok(None);
        };
        self.release(owner_id, id)
    }

    /// Release the slot starting at `slot_start`, splitting the covering
    /// reservation into zero, one or two remainders.
    ///
    /// The covering reservation must belong to `owner_id`. A slot nobody
    /// holds is a no-op.
    pub fn release_slot(
        &mut self,
        owner_id: &str,
        resource_code: &str,
        date: NaiveDate,
        slot_start: Minute,
    ) -> Result<Option<SlotRelease>, EngineError> {
        let Some(plan) = self
            .allocator
            .plan_release_slot(resource_code, date, slot_start)?
        else {
            debug!(resource = resource_code, %date, slot_start, "slot already free");
            return Ok(None);
        };
        if plan.released.owner_id != owner_id {
            return Err(EngineError::NotOwner {
                reservation: plan.released.id,
                owner: owner_id.to_string(),
            });
        }

        self.persist_and_apply(Event::SlotReleased {
            released: plan.released.id,
            fragments: plan.fragments.clone(),
        })?;
        metrics::counter!(observability::SLOT_RELEASES_TOTAL, "outcome" => plan.outcome.as_str())
            .increment(1);
        info!(
            released = %plan.released.id,
            resource = resource_code,
            %date,
            slot = %plan.slot,
            outcome = plan.outcome.as_str(),
            remaining = plan.fragments.len(),
            "slot released"
        );
        Ok(Some(plan))
    }

    fn append_entry(&mut self, entry: LedgerEntry) -> Result<LedgerEntry, EngineError> {
        self.ledger.validate(&entry)?;
        self.persist_and_apply(Event::LedgerAppended {
            entry: entry.clone(),
        })?;
        metrics::counter!(
            observability::LEDGER_APPENDS_TOTAL,
            "category" => category_label(entry.category)
        )
        .increment(1);
        debug!(id = %entry.id, owner = %entry.owner_id, amount = %entry.amount, "ledger entry appended");
        Ok(entry)
    }

    /// Record a usage charge against a reservation; the entry is correlated
    /// with the reservation id.
    pub fn charge_usage(
        &mut self,
        reservation_id: Ulid,
        amount: Decimal,
        note: &str,
    ) -> Result<LedgerEntry, EngineError> {
        let reservation = self
            .allocator
            .reservation(reservation_id)
            .ok_or_else(|| EngineError::NotFound(format!("reservation {reservation_id}")))?;
        let entry = LedgerEntry {
            id: Ulid::new(),
            owner_id: reservation.owner_id.clone(),
            category: Category::ResourceUsage,
            amount,
            date: reservation.date,
            note: note.to_string(),
            correlation_id: Some(reservation_id.to_string()),
        };
        self.append_entry(entry)
    }

    pub fn charge_subscription(
        &mut self,
        owner_id: &str,
        amount: Decimal,
        date: NaiveDate,
        note: &str,
        correlation_id: Option<String>,
    ) -> Result<LedgerEntry, EngineError> {
        let entry = LedgerEntry {
            id: Ulid::new(),
            owner_id: owner_id.to_string(),
            category: Category::SubscriptionFee,
            amount,
            date,
            note: note.to_string(),
            correlation_id,
        };
        self.append_entry(entry)
    }

    /// Append a usage entry for every Active reservation that has none yet,
    /// priced by `pricing`. Reservations on resources missing from the
    /// catalogue are skipped.
    pub fn bill_unbilled(
        &mut self,
        pricing: impl Fn(&Reservation, &ResourceRecord) -> Decimal,
    ) -> Result<BillingReport, EngineError> {
        let mut report = BillingReport::default();
        let mut pending = Vec::new();

        let mut active: Vec<&Reservation> = self.allocator.active().collect();
        active.sort_by_key(|r| (r.date, r.span.start, r.id));
        for reservation in active {
            if self
                .ledger
                .by_correlation_id(&reservation.id.to_string())
                .is_some()
            {
                report.skipped += 1;
                continue;
            }
            let Some(record) = self.resources.get(&reservation.resource_id) else {
                warn!(
                    id = %reservation.id,
                    resource = %reservation.resource_id,
                    "resource not in catalogue, reservation not billed"
                );
                report.skipped += 1;
                continue;
            };
            pending.push(LedgerEntry {
                id: Ulid::new(),
                owner_id: reservation.owner_id.clone(),
                category: Category::ResourceUsage,
                amount: pricing(reservation, record),
                date: reservation.date,
                note: format!(
                    "Booking: {} ({}) - {} {}",
                    record.name, record.kind, reservation.date, reservation.span
                ),
                correlation_id: Some(reservation.id.to_string()),
            });
        }

        for entry in pending {
            self.append_entry(entry)?;
            report.billed += 1;
        }
        info!(billed = report.billed, skipped = report.skipped, "unbilled reservations processed");
        Ok(report)
    }

    /// Replace the ledger wholesale. With a journal, the new contents are
    /// written as a fresh snapshot before memory changes.
    pub fn reload_ledger(
        &mut self,
        entries: impl IntoIterator<Item = LedgerEntry>,
    ) -> Result<(), EngineError> {
        let fresh = TransactionLedger::from_entries(entries)?;
        if let Some(journal) = self.journal.as_mut() {
            let events = snapshot_of(&self.allocator, &fresh);
            journal
                .compact(&events)
                .map_err(|e| EngineError::WalError(e.to_string()))?;
            metrics::counter!(observability::JOURNAL_COMPACTIONS_TOTAL).increment(1);
        }
        self.ledger = fresh;
        info!(entries = self.ledger.len(), "ledger reloaded");
        Ok(())
    }
}
