use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use ulid::Ulid;

use crate::model::*;
use crate::ranking::{rank_sites, SortMode};

use super::availability::free_spans;
use super::conflict::validate_span;
use super::{BookingEngine, EngineError};

impl BookingEngine {
    pub fn resource(&self, resource_code: &str) -> Option<&ResourceRecord> {
        self.resources.get(resource_code)
    }

    pub fn reservation(&self, id: Ulid) -> Option<&Reservation> {
        self.allocator.reservation(id)
    }

    pub fn reservations_for_owner(&self, owner_id: &str) -> Vec<&Reservation> {
        self.allocator.active_for_owner(owner_id)
    }

    /// Catalogue status with occupancy folded in: an Available resource with
    /// an Active reservation overlapping `span` reports Occupied.
    pub fn resource_status(
        &self,
        resource_code: &str,
        date: NaiveDate,
        span: &Span,
    ) -> Option<ResourceStatus> {
        let record = self.resources.get(resource_code)?;
        Some(match record.status {
            ResourceStatus::Available if self.allocator.is_occupied(resource_code, date, span) => {
                ResourceStatus::Occupied
            }
            status => status,
        })
    }

    /// Resources on one floor that match the filters, are not under
    /// maintenance, and are free for all of `span` on `date`.
    pub fn available_resources(
        &self,
        site: &str,
        floor: &str,
        kind: Option<&str>,
        min_capacity: u32,
        date: NaiveDate,
        span: Span,
    ) -> Result<Vec<ResourceRecord>, EngineError> {
        validate_span(&span)?;
        let mut found = self.resources.filter(site, floor, kind, min_capacity, true);
        found.retain(|r| !self.allocator.is_occupied(&r.resource_id, date, &span));
        Ok(found)
    }

    /// Free time of a catalogued resource within `opening` on `date`.
    pub fn free_spans(
        &self,
        resource_code: &str,
        date: NaiveDate,
        opening: Span,
    ) -> Result<Vec<Span>, EngineError> {
        validate_span(&opening)?;
        if self.resources.get(resource_code).is_none() {
            return Err(EngineError::NotFound(format!("resource {resource_code}")));
        }
        Ok(match self.allocator.day(resource_code, date) {
            Some(day) => free_spans(day, &opening),
            None => vec![opening],
        })
    }

    /// Active reservations per site. Every catalogued site appears, with zero
    /// if nothing is booked; reservations on uncatalogued resources are not
    /// counted.
    pub fn booking_counts_by_site(&self) -> BTreeMap<String, u64> {
        let mut counts: BTreeMap<String, u64> =
            self.resources.sites().map(|s| (s.to_string(), 0)).collect();
        for reservation in self.allocator.active() {
            if let Some(record) = self.resources.get(&reservation.resource_id)
                && let Some(count) = counts.get_mut(&record.site_label) {
                    *count += 1;
                }
        }
        counts
    }

    /// Usage revenue per site, following each entry's correlation id to its
    /// reservation (Active or Released) and on to the resource's site.
    pub fn revenue_by_site(&self) -> BTreeMap<String, Decimal> {
        let mut revenue: BTreeMap<String, Decimal> = self
            .resources
            .sites()
            .map(|s| (s.to_string(), Decimal::ZERO))
            .collect();
        for entry in self.ledger.by_category(Category::ResourceUsage) {
            let site = entry
                .correlation_id
                .as_deref()
                .and_then(|c| c.parse::<Ulid>().ok())
                .and_then(|id| self.allocator.reservation(id))
                .and_then(|r| self.resources.get(&r.resource_id))
                .map(|record| record.site_label.as_str());
            if let Some(site) = site
                && let Some(total) = revenue.get_mut(site) {
                    *total += entry.amount;
                }
        }
        revenue
    }

    pub fn ranked_sites(&self, mode: SortMode) -> Vec<String> {
        rank_sites(mode, &self.booking_counts_by_site(), &self.revenue_by_site())
    }
}
