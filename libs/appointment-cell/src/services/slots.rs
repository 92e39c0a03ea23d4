use chrono::{Local, NaiveDateTime, NaiveTime};

use crate::models::AppointmentError;

pub const SLOT_INTERVAL_MINUTES: u32 = 30;
const FIRST_SLOT_MINUTES: u32 = 8 * 60;
const LAST_SLOT_MINUTES: u32 = 17 * 60 + 30;

/// Bookable labels for any working day: `08:00` through `17:30`, 20 entries.
pub fn slot_catalog() -> Vec<String> {
    let mut slots = Vec::with_capacity(20);
    let mut minutes = FIRST_SLOT_MINUTES;

    while minutes < LAST_SLOT_MINUTES {
        slots.push(format_minutes(minutes));
        minutes += SLOT_INTERVAL_MINUTES;
    }
    slots.push(format_minutes(LAST_SLOT_MINUTES));

    slots
}

fn format_minutes(minutes: u32) -> String {
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// `HH:MM` becomes `HH:MM:00`; anything else is returned trimmed.
pub fn normalize_time(time: &str) -> String {
    let trimmed = time.trim();
    if trimmed.matches(':').count() == 1 {
        format!("{}:00", trimmed)
    } else {
        trimmed.to_string()
    }
}

pub fn parse_time(time: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(&normalize_time(time), "%H:%M:%S").ok()
}

/// Storage form of a time: validated and written as `HH:MM:SS`.
pub fn canonical_time(time: &str) -> Result<String, AppointmentError> {
    parse_time(time)
        .map(|parsed| parsed.format("%H:%M:%S").to_string())
        .ok_or_else(|| AppointmentError::InvalidTime(format!("'{}' is not a valid HH:MM time", time)))
}

/// Compares parsed times, so `9:30` and `09:30:00` are the same slot.
pub fn is_catalog_slot(time: &str) -> bool {
    let Some(parsed) = parse_time(time) else {
        return false;
    };
    slot_catalog().iter().any(|slot| parse_time(slot) == Some(parsed))
}

/// Whether two stored times denote the same instant, whatever their format.
pub fn same_time(a: &str, b: &str) -> bool {
    matches!((parse_time(a), parse_time(b)), (Some(a), Some(b)) if a == b)
}

/// Wall-clock time of the agency. The server runs in the agency's timezone.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}
