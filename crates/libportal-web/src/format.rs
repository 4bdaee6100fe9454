//! Display helpers shared by the page templates.

use jiff::{civil, Timestamp};

pub fn today() -> civil::Date {
    jiff::Zoned::now().date()
}

pub fn date(value: civil::Date) -> String {
    value.strftime("%b %-d, %Y").to_string()
}

pub fn optional_date(value: Option<civil::Date>) -> String {
    value.map(date).unwrap_or_else(|| "-".to_owned())
}

pub fn time(value: civil::Time) -> String {
    value.strftime("%-I:%M %p").to_string()
}

/// `value` formatted for an `<input type="date">`.
pub fn input_date(value: civil::Date) -> String {
    value.strftime("%Y-%m-%d").to_string()
}

/// `value` formatted for an `<input type="time">`.
pub fn input_time(value: civil::Time) -> String {
    value.strftime("%H:%M").to_string()
}

pub fn days_between(earlier: civil::Date, later: civil::Date) -> i64 {
    i64::from((later - earlier).get_days())
}

pub fn days_overdue(due_date: civil::Date, today: civil::Date) -> i64 {
    days_between(due_date, today).max(0)
}

fn units(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// "today", "yesterday", "3 days ago" or "in 2 days".
pub fn relative_day(value: civil::Date, today: civil::Date) -> String {
    match days_between(value, today) {
        0 => "today".to_owned(),
        1 => "yesterday".to_owned(),
        -1 => "tomorrow".to_owned(),
        days if days > 0 => format!("{} ago", units(days, "day")),
        days => format!("in {}", units(-days, "day")),
    }
}

pub fn time_ago(then: Timestamp, now: Timestamp) -> String {
    let seconds = now.as_second() - then.as_second();
    match seconds {
        s if s < 60 => "just now".to_owned(),
        s if s < 3_600 => format!("{} ago", units(s / 60, "minute")),
        s if s < 86_400 => format!("{} ago", units(s / 3_600, "hour")),
        s if s < 30 * 86_400 => format!("{} ago", units(s / 86_400, "day")),
        _ => then.strftime("%b %-d, %Y").to_string(),
    }
}

pub fn initials(first_name: &str, last_name: &str) -> String {
    first_name
        .chars()
        .take(1)
        .chain(last_name.chars().take(1))
        .flat_map(char::to_uppercase)
        .collect()
}
