// ── Booking activity ────────────────────────────────────────────

/// Counter: reservations created through `book`.
pub const RESERVATIONS_CREATED_TOTAL: &str = "deskbook_reservations_created_total";

/// Counter: whole reservations released.
pub const RESERVATIONS_RELEASED_TOTAL: &str = "deskbook_reservations_released_total";

/// Counter: slot releases that changed state. Labels: outcome (full, head, tail, split).
pub const SLOT_RELEASES_TOTAL: &str = "deskbook_slot_releases_total";

/// Counter: booking attempts rejected because the span was taken.
pub const BOOKING_CONFLICTS_TOTAL: &str = "deskbook_booking_conflicts_total";

// ── Ledger ──────────────────────────────────────────────────────

/// Counter: ledger entries appended. Labels: category.
pub const LEDGER_APPENDS_TOTAL: &str = "deskbook_ledger_appends_total";

// ── Journal ─────────────────────────────────────────────────────

/// Histogram: journal append + fsync duration in seconds.
pub const JOURNAL_APPEND_DURATION_SECONDS: &str = "deskbook_journal_append_duration_seconds";

/// Counter: journal compactions.
pub const JOURNAL_COMPACTIONS_TOTAL: &str = "deskbook_journal_compactions_total";

/// Install the default fmt subscriber. A second call is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt::try_init();
}

/// Map a ledger category to a short label for metrics.
pub fn category_label(category: crate::model::Category) -> &'static str {
    match category {
        crate::model::Category::ResourceUsage => "resource_usage",
        crate::model::Category::SubscriptionFee => "subscription_fee",
    }
}
