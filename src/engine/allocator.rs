use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::limits::*;
use crate::model::*;

use super::availability::subtract_intervals;
use super::conflict::{
    check_no_conflict, validate_owner, validate_resource_code, validate_slot_start, validate_span,
};
use super::EngineError;

/// Where the freed slot sat inside the reservation it was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The slot was the whole reservation; nothing remains.
    Full,
    /// First slot freed; the rest remains as one reservation.
    Head,
    /// Last slot freed; the rest remains as one reservation.
    Tail,
    /// Interior slot freed; two reservations remain.
    Split,
}

impl ReleaseOutcome {
    fn classify(original: &Span, slot: &Span) -> Self {
        match (slot.start == original.start, slot.end == original.end) {
            (true, true) => ReleaseOutcome::Full,
            (true, false) => ReleaseOutcome::Head,
            (false, true) => ReleaseOutcome::Tail,
            (false, false) => ReleaseOutcome::Split,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseOutcome::Full => "full",
            ReleaseOutcome::Head => "head",
            ReleaseOutcome::Tail => "tail",
            ReleaseOutcome::Split => "split",
        }
    }
}

/// A planned slot release: the covering reservation (still Active when
/// planned) and the fragments that replace it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRelease {
    pub released: Reservation,
    pub slot: Span,
    pub fragments: Vec<Reservation>,
    pub outcome: ReleaseOutcome,
}

/// Interval sets per resource-day.
///
/// Active reservations of one resource-day are pairwise disjoint at all
/// times. Every mutation validates fully before touching state, so an `Err`
/// always leaves the allocator unchanged.
#[derive(Debug, Default)]
pub struct ReservationAllocator {
    days: HashMap<ResourceDay, DayState>,
    /// Reservation id (Active or Released) → its resource-day.
    locator: HashMap<Ulid, ResourceDay>,
}

impl ReservationAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn day(&self, resource_id: &str, date: NaiveDate) -> Option<&DayState> {
        self.days.get(&ResourceDay::new(resource_id, date))
    }

    /// True iff an Active reservation overlaps `span` on that resource-day.
    pub fn is_occupied(&self, resource_id: &str, date: NaiveDate, span: &Span) -> bool {
        self.day(resource_id, date)
            .is_some_and(|day| day.overlapping(span).next().is_some())
    }

    /// The Active reservation whose span contains `instant`.
    pub fn covering_reservation(
        &self,
        resource_id: &str,
        date: NaiveDate,
        instant: Minute,
    ) -> Option<&Reservation> {
        self.day(resource_id, date)?.covering(instant)
    }

    /// Validate a booking request and build the reservation without storing it.
    pub fn plan_create(
        &self,
        owner_id: &str,
        resource_id: &str,
        date: NaiveDate,
        span: Span,
        price_basis: Decimal,
    ) -> Result<Reservation, EngineError> {
        validate_owner(owner_id)?;
        validate_resource_code(resource_id)?;
        validate_span(&span)?;
        if price_basis.is_sign_negative() {
            return Err(EngineError::InvalidArgument("price basis is negative"));
        }
        if let Some(day) = self.day(resource_id, date) {
            check_no_conflict(day, &span)?;
            if day.active.len() >= MAX_ACTIVE_PER_DAY {
                return Err(EngineError::LimitExceeded("too many reservations on resource-day"));
            }
            if day.released.len() >= MAX_RELEASED_PER_DAY {
                return Err(EngineError::LimitExceeded("too much released history on resource-day"));
            }
        }
        Ok(Reservation {
            id: Ulid::new(),
            owner_id: owner_id.to_string(),
            resource_id: resource_id.to_string(),
            date,
            span,
            status: ReservationStatus::Active,
            price_basis,
        })
    }

    /// Book `span` if nothing Active overlaps it.
    pub fn create(
        &mut self,
        owner_id: &str,
        resource_id: &str,
        date: NaiveDate,
        span: Span,
        price_basis: Decimal,
    ) -> Result<Reservation, EngineError> {
        let reservation = self.plan_create(owner_id, resource_id, date, span, price_basis)?;
        self.store(reservation.clone());
        Ok(reservation)
    }

    /// Store an existing reservation (journal replay, snapshots). Released
    /// reservations go straight to history and never conflict.
    pub fn insert(&mut self, reservation: Reservation) -> Result<(), EngineError> {
        validate_span(&reservation.span)?;
        if self.locator.contains_key(&reservation.id) {
            return Err(EngineError::AlreadyExists(reservation.id));
        }
        if reservation.is_active()
            && let Some(day) = self.days.get(&reservation.day()) {
                check_no_conflict(day, &reservation.span)?;
            }
        self.store(reservation);
        Ok(())
    }

    fn store(&mut self, reservation: Reservation) {
        let key = reservation.day();
        self.locator.insert(reservation.id, key.clone());
        let day = self.days.entry(key).or_default();
        if reservation.is_active() {
            day.insert_active(reservation);
        } else {
            day.released.push(reservation);
        }
    }

    /// Release a whole reservation. `None` if absent or already Released.
    pub fn release(&mut self, id: Ulid) -> Option<Reservation> {
        let key = self.locator.get(&id)?;
        let day = self.days.get_mut(key)?;
        let removed = day.remove_active(id)?;
        day.retire(removed);
        day.released.last().cloned()
    }

    /// Work out what releasing the slot at `slot_start` would do.
    /// `Ok(None)` when no Active reservation covers it.
    pub fn plan_release_slot(
        &self,
        resource_id: &str,
        date: NaiveDate,
        slot_start: Minute,
    ) -> Result<Option<SlotRelease>, EngineError> {
        let slot = validate_slot_start(slot_start)?;
        let Some(covering) = self.covering_reservation(resource_id, date, slot_start) else {
            return Ok(None);
        };
        let fragments = subtract_intervals(
            std::slice::from_ref(&covering.span),
            std::slice::from_ref(&slot),
        )
        .into_iter()
        .map(|span| covering.fragment(span))
        .collect();
        Ok(Some(SlotRelease {
            released: covering.clone(),
            slot,
            fragments,
            outcome: ReleaseOutcome::classify(&covering.span, &slot),
        }))
    }

    /// Replace the Active reservation `released` by `fragments` in one step.
    ///
    /// Fragments must be fresh, Active, pairwise disjoint and lie inside the
    /// released span on the same resource-day for the same owner. Returns the
    /// retired reservation.
    pub fn apply_release(
        &mut self,
        released: Ulid,
        fragments: Vec<Reservation>,
    ) -> Result<Reservation, EngineError> {
        let key = self
            .locator
            .get(&released)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("reservation {released}")))?;
        let day = self
            .days
            .get_mut(&key)
            .ok_or_else(|| EngineError::NotFound(format!("reservation {released}")))?;
        let pos = day
            .active
            .iter()
            .position(|r| r.id == released)
            .ok_or_else(|| EngineError::NotFound(format!("active reservation {released}")))?;

        let original = &day.active[pos];
        for (i, fragment) in fragments.iter().enumerate() {
            validate_span(&fragment.span)?;
            if !fragment.is_active()
                || fragment.resource_id != key.resource_id
                || fragment.date != key.date
                || fragment.owner_id != original.owner_id
            {
                return Err(EngineError::InvalidArgument(
                    "fragment does not belong to the released reservation",
                ));
            }
            if !original.span.contains_span(&fragment.span) {
                return Err(EngineError::InvalidArgument(
                    "fragment lies outside the released reservation",
                ));
            }
            if self.locator.contains_key(&fragment.id)
                || fragments[..i].iter().any(|f| f.id == fragment.id)
            {
                return Err(EngineError::AlreadyExists(fragment.id));
            }
            if let Some(other) = fragments[..i].iter().find(|f| f.span.overlaps(&fragment.span)) {
                return Err(EngineError::Conflict(other.id));
            }
        }

        let removed = day.active.remove(pos);
        day.retire(removed.clone());
        for fragment in fragments {
            self.locator.insert(fragment.id, key.clone());
            day.insert_active(fragment);
        }
        Ok(Reservation {
            status: ReservationStatus::Released,
            ..removed
        })
    }

    /// Release one slot, splitting the covering reservation as needed.
    /// Releasing a free slot is a no-op.
    pub fn release_slot(
        &mut self,
        resource_id: &str,
        date: NaiveDate,
        slot_start: Minute,
    ) -> Result<Option<SlotRelease>, EngineError> {
        let Some(plan) = self.plan_release_slot(resource_id, date, slot_start)? else {
            return Ok(None);
        };
        self.apply_release(plan.released.id, plan.fragments.clone())?;
        Ok(Some(plan))
    }

    // ── Queries ──────────────────────────────────────────────

    /// Any reservation by id, Active or Released.
    pub fn reservation(&self, id: Ulid) -> Option<&Reservation> {
        let day = self.days.get(self.locator.get(&id)?)?;
        day.active
            .iter()
            .chain(day.released.iter())
            .find(|r| r.id == id)
    }

    /// Active reservations of one resource-day, ordered by start.
    pub fn active_for(&self, resource_id: &str, date: NaiveDate) -> &[Reservation] {
        self.day(resource_id, date)
            .map(|day| day.active.as_slice())
            .unwrap_or(&[])
    }

    /// Released reservations of one resource-day, in release order.
    pub fn history_for(&self, resource_id: &str, date: NaiveDate) -> &[Reservation] {
        self.day(resource_id, date)
            .map(|day| day.released.as_slice())
            .unwrap_or(&[])
    }

    /// Active reservations of a resource across all dates, by (date, start).
    pub fn active_for_resource(&self, resource_id: &str) -> Vec<&Reservation> {
        let mut found: Vec<&Reservation> = self
            .days
            .iter()
            .filter(|(key, _)| key.resource_id == resource_id)
            .flat_map(|(_, day)| day.active.iter())
            .collect();
        found.sort_by_key(|r| (r.date, r.span.start));
        found
    }

    /// Active reservations held by `owner_id`, by (date, start, resource).
    pub fn active_for_owner(&self, owner_id: &str) -> Vec<&Reservation> {
        let mut found: Vec<&Reservation> = self
            .active()
            .filter(|r| r.owner_id == owner_id)
            .collect();
        found.sort_by(|a, b| {
            (a.date, a.span.start, &a.resource_id).cmp(&(b.date, b.span.start, &b.resource_id))
        });
        found
    }

    pub fn active(&self) -> impl Iterator<Item = &Reservation> {
        self.days.values().flat_map(|day| day.active.iter())
    }

    /// Every stored reservation, Active and Released, in no particular order.
    pub fn all(&self) -> impl Iterator<Item = &Reservation> {
        self.days
            .values()
            .flat_map(|day| day.active.iter().chain(day.released.iter()))
    }

    pub fn active_count(&self) -> usize {
        self.days.values().map(|day| day.active.len()).sum()
    }

    /// Reservations ever stored, including Released ones.
    pub fn len(&self) -> usize {
        self.locator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locator.is_empty()
    }
}
