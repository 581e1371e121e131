use crate::model::*;

// ── Free time within a day ────────────────────────────────────────

/// Free sub-spans of `opening` on one resource-day: the window minus every
/// Active reservation. Released history never blocks.
pub fn free_spans(day: &DayState, opening: &Span) -> Vec<Span> {
    let busy = occupied_spans(day, opening);
    if busy.is_empty() {
        return vec![*opening];
    }
    subtract_intervals(std::slice::from_ref(opening), &busy)
}

/// Active reservations clamped to `window`, merged into disjoint spans.
pub fn occupied_spans(day: &DayState, window: &Span) -> Vec<Span> {
    let clamped: Vec<Span> = day
        .overlapping(window)
        .map(|r| Span::new(r.span.start.max(window.start), r.span.end.min(window.end)))
        .collect();
    // Already sorted by start: the day keeps its Active list ordered.
    merge_overlapping(&clamped)
}

/// Every slot start that is entirely free, in order.
pub fn free_slot_starts(free: &[Span]) -> Vec<Minute> {
    let mut starts = Vec::new();
    for span in free {
        let first = span.start.div_ceil(SLOT_MINUTES) * SLOT_MINUTES;
        let mut t = first;
        while t + SLOT_MINUTES <= span.end {
            starts.push(t);
            t += SLOT_MINUTES;
        }
    }
    starts
}

/// Merge sorted overlapping/adjacent intervals into disjoint intervals.
pub fn merge_overlapping(sorted: &[Span]) -> Vec<Span> {
    let mut merged: Vec<Span> = Vec::new();
    for &span in sorted {
        if let Some(last) = merged.last_mut()
            && span.start <= last.end {
                last.end = last.end.max(span.end);
                continue;
            }
        merged.push(span);
    }
    merged
}

/// `base \ to_remove`. Both inputs sorted by start; `to_remove` disjoint.
pub fn subtract_intervals(base: &[Span], to_remove: &[Span]) -> Vec<Span> {
    let mut result = Vec::new();
    let mut ri = 0;

    for &b in base {
        let mut current_start = b.start;
        let current_end = b.end;

        while ri < to_remove.len() && to_remove[ri].end <= current_start {
            ri += 1;
        }

        let mut j = ri;
        while j < to_remove.len() && to_remove[j].start < current_end {
            let r = &to_remove[j];
            if r.start > current_start {
                result.push(Span::new(current_start, r.start));
            }
            current_start = current_start.max(r.end);
            j += 1;
        }

        if current_start < current_end {
            result.push(Span::new(current_start, current_end));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use ulid::Ulid;

    fn day_with(spans: &[(Minute, Minute)]) -> DayState {
        let mut day = DayState::new();
        for &(start, end) in spans {
            day.insert_active(Reservation {
                id: Ulid::new(),
                owner_id: "u1".into(),
                resource_id: "R".into(),
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                span: Span::new(start, end),
                status: ReservationStatus::Active,
                price_basis: Decimal::ZERO,
            });
        }
        day
    }

    // ── subtract_intervals ────────────────────────────────

    #[test]
    fn subtract_no_overlap() {
        let base = vec![Span::new(100, 200), Span::new(300, 400)];
        let remove = vec![Span::new(200, 300)];
        assert_eq!(subtract_intervals(&base, &remove), base);
    }

    #[test]
    fn subtract_full_overlap() {
        let base = vec![Span::new(100, 200)];
        let remove = vec![Span::new(50, 250)];
        assert!(subtract_intervals(&base, &remove).is_empty());
    }

    #[test]
    fn subtract_partial_edges() {
        let base = vec![Span::new(100, 200)];
        assert_eq!(
            subtract_intervals(&base, &[Span::new(50, 150)]),
            vec![Span::new(150, 200)]
        );
        assert_eq!(
            subtract_intervals(&base, &[Span::new(150, 250)]),
            vec![Span::new(100, 150)]
        );
    }

    #[test]
    fn subtract_multiple_punches() {
        let base = vec![Span::new(0, 1000)];
        let remove = vec![
            Span::new(100, 200),
            Span::new(400, 500),
            Span::new(800, 900),
        ];
        assert_eq!(
            subtract_intervals(&base, &remove),
            vec![
                Span::new(0, 100),
                Span::new(200, 400),
                Span::new(500, 800),
                Span::new(900, 1000),
            ]
        );
    }

    // ── merge_overlapping ────────────────────────────────

    #[test]
    fn merge_overlapping_basic() {
        let spans = vec![
            Span::new(100, 300),
            Span::new(200, 400),
            Span::new(500, 600),
        ];
        assert_eq!(
            merge_overlapping(&spans),
            vec![Span::new(100, 400), Span::new(500, 600)]
        );
    }

    #[test]
    fn merge_overlapping_adjacent() {
        let spans = vec![Span::new(100, 200), Span::new(200, 300)];
        assert_eq!(merge_overlapping(&spans), vec![Span::new(100, 300)]);
    }

    // ── free_spans ────────────────────────────────────────

    #[test]
    fn free_spans_empty_day_is_whole_window() {
        let opening = Span::new(hm(8, 0), hm(18, 0));
        assert_eq!(free_spans(&DayState::new(), &opening), vec![opening]);
    }

    #[test]
    fn free_spans_punches_out_bookings() {
        let day = day_with(&[(hm(9, 0), hm(9, 30)), (hm(10, 0), hm(11, 0))]);
        let free = free_spans(&day, &Span::new(hm(8, 0), hm(12, 0)));
        assert_eq!(
            free,
            vec![
                Span::new(hm(8, 0), hm(9, 0)),
                Span::new(hm(9, 30), hm(10, 0)),
                Span::new(hm(11, 0), hm(12, 0)),
            ]
        );
    }

    #[test]
    fn free_spans_clamps_bookings_outside_window() {
        let day = day_with(&[(hm(7, 0), hm(9, 0)), (hm(17, 0), hm(20, 0))]);
        let free = free_spans(&day, &Span::new(hm(8, 0), hm(18, 0)));
        assert_eq!(free, vec![Span::new(hm(9, 0), hm(17, 0))]);
    }

    #[test]
    fn fully_booked_window_has_no_free_time() {
        let day = day_with(&[(0, MINUTES_PER_DAY)]);
        assert!(free_spans(&day, &Span::new(hm(9, 0), hm(10, 0))).is_empty());
    }

    #[test]
    fn adjacent_bookings_merge_into_one_busy_span() {
        let day = day_with(&[(hm(9, 0), hm(10, 0)), (hm(10, 0), hm(11, 0))]);
        assert_eq!(
            occupied_spans(&day, &Span::new(0, MINUTES_PER_DAY)),
            vec![Span::new(hm(9, 0), hm(11, 0))]
        );
    }

    #[test]
    fn slot_starts_skip_partial_slots() {
        let free = vec![Span::new(hm(9, 0), hm(10, 0)), Span::new(hm(10, 45), hm(11, 45))];
        assert_eq!(
            free_slot_starts(&free),
            vec![hm(9, 0), hm(9, 30), hm(11, 0)]
        );
    }
}
