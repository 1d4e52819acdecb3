//! Absolute time literal decomposition
//!
//! Accepts both calendar forms of the standard:
//!
//! - `YYYY-MM-DDThh:mm:ss[.f]Z`
//! - `YYYY-DDDThh:mm:ss[.f]Z` (day of year)
//!
//! The fraction is right-padded to microseconds. Every field is range
//! checked so the runtime never receives an impossible timestamp.

use crate::export::ir::Timestamp;

const MAX_FRACTION_DIGITS: usize = 6;

/// Decompose an absolute time literal, or describe why it is invalid
pub fn parse_absolute_time(text: &str) -> Result<Timestamp, String> {
    let body = text
        .strip_suffix('Z')
        .ok_or_else(|| format!("'{text}' does not end in 'Z'"))?;
    let (date, time) = body
        .split_once('T')
        .ok_or_else(|| format!("'{text}' has no 'T' separator"))?;

    let (year, month, day) = match date.split('-').collect::<Vec<_>>().as_slice() {
        [year, month, day] => {
            let year = field(year, "year")?;
            let month = field(month, "month")?;
            if !(1..=12).contains(&month) {
                return Err(format!("month {month} is out of range"));
            }
            let day = field(day, "day")?;
            if day == 0 || day > days_in_month(year, month) {
                return Err(format!("day {day} is out of range for {year}-{month:02}"));
            }
            (year, month, day)
        }
        [year, day_of_year] => {
            let year = field(year, "year")?;
            let (month, day) = month_day(year, field(day_of_year, "day of year")?)?;
            (year, month, day)
        }
        _ => return Err(format!("'{date}' is not a calendar date")),
    };

    let (clock, fraction) = match time.split_once('.') {
        Some((clock, fraction)) => (clock, Some(fraction)),
        None => (time, None),
    };
    let parts: Vec<&str> = clock.split(':').collect();
    let [hour, minute, second] = parts.as_slice() else {
        return Err(format!("'{clock}' is not a time of day"));
    };
    let hour = bounded(hour, "hour", 23)?;
    let minute = bounded(minute, "minute", 59)?;
    let second = bounded(second, "second", 59)?;

    let microsecond = match fraction {
        None => 0,
        Some(digits) if digits.len() > MAX_FRACTION_DIGITS => {
            return Err(format!("fraction '{digits}' is finer than microseconds"));
        }
        Some(digits) => {
            let padded = format!("{digits:0<width$}", width = MAX_FRACTION_DIGITS);
            field(&padded, "fraction")?
        }
    };

    Ok(Timestamp {
        year,
        month,
        day,
        hour,
        minute,
        second,
        microsecond,
    })
}

fn field(digits: &str, name: &str) -> Result<u32, String> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("{name} '{digits}' is not a number"));
    }
    digits
        .parse()
        .map_err(|_| format!("{name} '{digits}' is not a number"))
}

fn bounded(digits: &str, name: &str, max: u32) -> Result<u32, String> {
    let value = field(digits, name)?;
    if value > max {
        return Err(format!("{name} {value} is out of range"));
    }
    Ok(value)
}

fn is_leap_year(year: u32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        2 if is_leap_year(year) => 29,
        2 => 28,
        4 | 6 | 9 | 11 => 30,
        _ => 31,
    }
}

/// Month and day of month for a 1-based day of year
fn month_day(year: u32, day_of_year: u32) -> Result<(u32, u32), String> {
    let mut remaining = day_of_year;
    if remaining == 0 {
        return Err("day of year 0 is out of range".to_string());
    }
    for month in 1..=12 {
        let length = days_in_month(year, month);
        if remaining <= length {
            return Ok((month, remaining));
        }
        remaining -= length;
    }
    Err(format!("day of year {day_of_year} is out of range for {year}"))
}
