use std::fmt;

use chrono::{NaiveDate, NaiveTime, Timelike};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Minutes since midnight. The only time-of-day type.
pub type Minute = u16;

pub const MINUTES_PER_DAY: Minute = 24 * 60;

/// Booking and release granularity.
pub const SLOT_MINUTES: Minute = 30;

/// `hm(9, 30)` is 09:30.
pub const fn hm(hour: u16, minute: u16) -> Minute {
    hour * 60 + minute
}

/// Truncates seconds.
pub fn minute_of(time: NaiveTime) -> Minute {
    (time.hour() * 60 + time.minute()) as Minute
}

/// `None` for 24:00 and beyond.
pub fn time_of(minute: Minute) -> Option<NaiveTime> {
    NaiveTime::from_hms_opt(u32::from(minute / 60), u32::from(minute % 60), 0)
}

/// Half-open interval `[start, end)` within one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Minute,
    pub end: Minute,
}

impl Span {
    pub fn new(start: Minute, end: Minute) -> Self {
        debug_assert!(start < end, "Span start must be before end");
        Self { start, end }
    }

    /// The single slot starting at `start`.
    pub fn slot(start: Minute) -> Self {
        Self::new(start, start + SLOT_MINUTES)
    }

    pub fn duration_minutes(&self) -> Minute {
        self.end - self.start
    }

    pub fn overlaps(&self, other: &Span) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: Minute) -> bool {
        self.start <= t && t < self.end
    }

    /// Returns true if `self` fully contains `other`.
    pub fn contains_span(&self, other: &Span) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    pub fn is_slot_aligned(&self) -> bool {
        self.start % SLOT_MINUTES == 0 && self.end % SLOT_MINUTES == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}-{:02}:{:02}",
            self.start / 60,
            self.start % 60,
            self.end / 60,
            self.end % 60
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Active,
    Released,
}

/// One booked interval of a resource on a given date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: Ulid,
    pub owner_id: String,
    /// Public resource code, e.g. `A-01-01`.
    pub resource_id: String,
    pub date: NaiveDate,
    pub span: Span,
    pub status: ReservationStatus,
    /// Hourly rate in effect when the reservation was made.
    pub price_basis: Decimal,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status == ReservationStatus::Active
    }

    pub fn day(&self) -> ResourceDay {
        ResourceDay::new(self.resource_id.clone(), self.date)
    }

    /// A fresh Active reservation over `span`, inheriting owner, resource,
    /// date and price basis.
    pub fn fragment(&self, span: Span) -> Reservation {
        Reservation {
            id: Ulid::new(),
            owner_id: self.owner_id.clone(),
            resource_id: self.resource_id.clone(),
            date: self.date,
            span,
            status: ReservationStatus::Active,
            price_basis: self.price_basis,
        }
    }
}

/// Scope of the non-overlap invariant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceDay {
    pub resource_id: String,
    pub date: NaiveDate,
}

impl ResourceDay {
    pub fn new(resource_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            resource_id: resource_id.into(),
            date,
        }
    }
}

/// All reservations of one resource-day.
#[derive(Debug, Clone, Default)]
pub struct DayState {
    /// Active reservations, pairwise disjoint, sorted by `span.start`.
    pub active: Vec<Reservation>,
    /// Released reservations in release order.
    pub released: Vec<Reservation>,
}

impl DayState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an Active reservation maintaining sort order by span.start.
    pub fn insert_active(&mut self, reservation: Reservation) {
        let pos = self
            .active
            .binary_search_by_key(&reservation.span.start, |r| r.span.start)
            .unwrap_or_else(|e| e);
        self.active.insert(pos, reservation);
    }

    /// Remove an Active reservation by id.
    pub fn remove_active(&mut self, id: Ulid) -> Option<Reservation> {
        let pos = self.active.iter().position(|r| r.id == id)?;
        Some(self.active.remove(pos))
    }

    /// Mark as Released and move to history.
    pub fn retire(&mut self, mut reservation: Reservation) {
        reservation.status = ReservationStatus::Released;
        self.released.push(reservation);
    }

    /// Return only Active reservations whose span overlaps the query window.
    /// Uses binary search to skip reservations starting at or after `query.end`.
    pub fn overlapping(&self, query: &Span) -> impl Iterator<Item = &Reservation> {
        let right_bound = self.active.partition_point(|r| r.span.start < query.end);
        self.active[..right_bound]
            .iter()
            .filter(move |r| r.span.end > query.start)
    }

    /// The Active reservation whose span contains `instant`.
    pub fn covering(&self, instant: Minute) -> Option<&Reservation> {
        let idx = self.active.partition_point(|r| r.span.start <= instant);
        let candidate = self.active[..idx].last()?;
        candidate.span.contains_instant(instant).then_some(candidate)
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty() && self.released.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    ResourceUsage,
    SubscriptionFee,
}

/// Immutable financial record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: Ulid,
    pub owner_id: String,
    pub category: Category,
    /// Never negative.
    pub amount: Decimal,
    pub date: NaiveDate,
    pub note: String,
    /// Reservation id or subscription event that caused this entry.
    pub correlation_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceStatus {
    Available,
    Maintenance,
    /// Derived from the allocator; never a stored catalogue state in practice.
    Occupied,
}

/// A bookable space as supplied by the catalogue loader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub id: String,
    pub name: String,
    pub floor_label: String,
    /// Public code reservations refer to.
    pub resource_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub site_label: String,
    pub capacity: u32,
    pub status: ResourceStatus,
    pub rate_per_hour: Decimal,
}

impl ResourceRecord {
    pub fn is_available(&self) -> bool {
        self.status == ResourceStatus::Available
    }
}

/// One journal record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// Also used by snapshots, where `reservation.status` may be Released.
    ReservationCreated { reservation: Reservation },
    ReservationReleased { id: Ulid },
    /// Outcome of a slot release: the retired reservation plus zero, one or
    /// two remaining fragments.
    SlotReleased {
        released: Ulid,
        fragments: Vec<Reservation>,
    },
    LedgerAppended { entry: LedgerEntry },
}
