use time::{Duration, OffsetDateTime};

/// Current UTC time truncated to whole milliseconds.
///
/// Persisted timestamps carry millisecond precision, so every stamp the store
/// produces is truncated up front and survives a save/restore unchanged.
#[must_use]
pub fn now() -> OffsetDateTime {
    truncate_to_millis(OffsetDateTime::now_utc())
}

/// Drop sub-millisecond precision from `ts`.
#[must_use]
pub fn truncate_to_millis(ts: OffsetDateTime) -> OffsetDateTime {
    ts.replace_millisecond(ts.millisecond()).unwrap_or(ts)
}

/// Next modification stamp for something last touched at `previous`.
///
/// Always strictly later than `previous`, even when the wall clock has not moved
/// (or moved backwards) since then.
#[must_use]
pub fn advance(previous: OffsetDateTime, now: OffsetDateTime) -> OffsetDateTime {
    let floor = previous + Duration::milliseconds(1);
    if now >= floor { now } else { floor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn truncation_keeps_milliseconds_only() {
        let ts = datetime!(2024-03-01 10:00:00.123_456_789 UTC);
        assert_eq!(truncate_to_millis(ts), datetime!(2024-03-01 10:00:00.123 UTC));
    }

    #[test]
    fn advance_moves_forward_when_clock_stalls() {
        let prev = datetime!(2024-03-01 10:00:00.500 UTC);
        assert_eq!(advance(prev, prev), datetime!(2024-03-01 10:00:00.501 UTC));
        assert_eq!(
            advance(prev, datetime!(2024-03-01 09:00:00 UTC)),
            datetime!(2024-03-01 10:00:00.501 UTC)
        );
        let later = datetime!(2024-03-01 10:00:05 UTC);
        assert_eq!(advance(prev, later), later);
    }
}
