//! Proleptic Gregorian calendar helpers on UNIX timestamps (seconds, UTC).

pub const SECONDS_PER_DAY: u64 = 86_400;

/// Days since 1970-01-01 for a civil date.
fn days_from_civil(year: i64, month: u32, day: u32) -> i64 {
    let y = if month <= 2 { year - 1 } else { year };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let mp = (month as i64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + day as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Civil date for a count of days since 1970-01-01.
fn civil_from_days(days: i64) -> (i64, u32, u32) {
    let z = days + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

fn is_leap(year: i64) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Moves `timestamp` forward by whole calendar years, keeping month, day and
/// time of day. February 29 lands on February 28 in non-leap years.
///
/// Saturates at `u64::MAX` for offsets past the representable range.
pub fn add_years(timestamp: u64, years: u32) -> u64 {
    let days = (timestamp / SECONDS_PER_DAY) as i64;
    let secs = timestamp % SECONDS_PER_DAY;

    let (year, month, day) = civil_from_days(days);
    let target = year + years as i64;
    let day = if month == 2 && day == 29 && !is_leap(target) {
        28
    } else {
        day
    };

    let shifted = days_from_civil(target, month, day) as u64;
    shifted
        .checked_mul(SECONDS_PER_DAY)
        .and_then(|s| s.checked_add(secs))
        .unwrap_or(u64::MAX)
}

/// Writes `timestamp` as `YYYY-MM-DD`. Years past 9999 are clamped.
pub fn format_iso_date(timestamp: u64) -> [u8; 10] {
    let (year, month, day) = civil_from_days((timestamp / SECONDS_PER_DAY) as i64);
    let year = year.clamp(0, 9_999) as u32;

    let mut out = [b'-'; 10];
    out[0] = b'0' + (year / 1_000) as u8;
    out[1] = b'0' + (year / 100 % 10) as u8;
    out[2] = b'0' + (year / 10 % 10) as u8;
    out[3] = b'0' + (year % 10) as u8;
    out[5] = b'0' + (month / 10) as u8;
    out[6] = b'0' + (month % 10) as u8;
    out[8] = b'0' + (day / 10) as u8;
    out[9] = b'0' + (day % 10) as u8;
    out
}
