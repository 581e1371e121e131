use crate::model::*;

use super::EngineError;

/// A bookable span: non-empty, inside one day, on slot boundaries.
pub(crate) fn validate_span(span: &Span) -> Result<(), EngineError> {
    if span.start >= span.end {
        return Err(EngineError::InvalidArgument("span start must be before end"));
    }
    if span.end > MINUTES_PER_DAY {
        return Err(EngineError::InvalidArgument("span ends after midnight"));
    }
    if !span.is_slot_aligned() {
        return Err(EngineError::Misaligned(*span));
    }
    Ok(())
}

/// Slot starts must be aligned and leave room for a whole slot before midnight.
pub(crate) fn validate_slot_start(slot_start: Minute) -> Result<Span, EngineError> {
    if slot_start % SLOT_MINUTES != 0 {
        return Err(EngineError::Misaligned(Span {
            start: slot_start,
            end: slot_start.saturating_add(SLOT_MINUTES),
        }));
    }
    if slot_start >= MINUTES_PER_DAY {
        return Err(EngineError::InvalidArgument("slot starts after midnight"));
    }
    Ok(Span::slot(slot_start))
}

/// Half-open overlap test against every Active reservation of the day.
pub(crate) fn check_no_conflict(day: &DayState, span: &Span) -> Result<(), EngineError> {
    if let Some(existing) = day.overlapping(span).next() {
        return Err(EngineError::Conflict(existing.id));
    }
    Ok(())
}

pub(crate) fn validate_owner(owner_id: &str) -> Result<(), EngineError> {
    use crate::limits::MAX_OWNER_ID_LEN;
    if owner_id.is_empty() {
        return Err(EngineError::InvalidArgument("owner id is empty"));
    }
    if owner_id.len() > MAX_OWNER_ID_LEN {
        return Err(EngineError::LimitExceeded("owner id too long"));
    }
    Ok(())
}

pub(crate) fn validate_resource_code(code: &str) -> Result<(), EngineError> {
    use crate::limits::MAX_RESOURCE_CODE_LEN;
    if code.is_empty() {
        return Err(EngineError::InvalidArgument("resource code is empty"));
    }
    if code.len() > MAX_RESOURCE_CODE_LEN {
        return Err(EngineError::LimitExceeded("resource code too long"));
    }
    Ok(())
}
