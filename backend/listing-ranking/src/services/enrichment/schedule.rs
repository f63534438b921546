use crate::models::OpeningHoursRule;
use tracing::debug;

/// Parse `HH:MM` (optionally `HH:MM:SS`) into minutes since midnight
pub fn parse_clock(raw: &str) -> Option<u32> {
    let mut parts = raw.trim().split(':');
    let hours = parse_component(parts.next()?)?;
    let minutes = parse_component(parts.next()?)?;
    if let Some(seconds) = parts.next() {
        parse_component(seconds)?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(hours * 60 + minutes)
}

fn parse_component(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Whether the weekly table says the listing is open at `minutes` on `weekday`.
///
/// Only the first rule for the weekday counts. Opening spans never wrap past
/// midnight: a close time earlier than the open time means closed all day.
pub fn open_by_schedule(
    listing_id: &str,
    schedule: &[OpeningHoursRule],
    weekday: u8,
    minutes: u32,
) -> bool {
    let Some(rule) = schedule.iter().find(|r| r.day == Some(weekday)) else {
        return false;
    };
    if rule.closed {
        return false;
    }

    let (Some(open), Some(close)) = (rule.open.as_deref(), rule.close.as_deref()) else {
        return false;
    };

    match (parse_clock(open), parse_clock(close)) {
        (Some(open_minutes), Some(close_minutes)) => {
            open_minutes <= minutes && minutes < close_minutes
        }
        _ => {
            debug!(
                listing_id = %listing_id,
                open = %open,
                close = %close,
                "Unparseable opening hours; treating listing as closed"
            );
            false
        }
    }
}
