// Hard caps on caller-supplied data.

pub const MAX_OWNER_ID_LEN: usize = 64;
pub const MAX_RESOURCE_CODE_LEN: usize = 64;
pub const MAX_NOTE_LEN: usize = 512;
pub const MAX_CORRELATION_ID_LEN: usize = 64;

/// A day has 48 half-hour slots, so no resource-day can hold more disjoint
/// Active reservations than this.
pub const MAX_ACTIVE_PER_DAY: usize = 48;

/// Released history per resource-day before new bookings are refused.
pub const MAX_RELEASED_PER_DAY: usize = 4096;

/// Largest encoded journal payload. A length prefix beyond this is treated
/// as corruption rather than allocated.
pub const MAX_RECORD_BYTES: usize = 1 << 20;
