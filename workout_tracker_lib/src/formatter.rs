//! Display formatting for session values. Negative magnitudes render as
//! placeholders so a view can show "no value yet" without special casing.

const MILLIS_PER_HOUR: i64 = 3_600_000;
const MILLIS_PER_MINUTE: i64 = 60_000;
const MILLIS_PER_SECOND: i64 = 1_000;

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// `HH:MM:SS` with zero padding, or `-- sec` for a negative duration.
pub fn format_duration(duration_ms: i64) -> String {
    if duration_ms < 0 {
        return "-- sec".to_string();
    }
    let hours = duration_ms / MILLIS_PER_HOUR;
    let minutes = duration_ms / MILLIS_PER_MINUTE % 60;
    let seconds = duration_ms / MILLIS_PER_SECOND % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Kilometres with two decimals, or `-- km` for a negative distance.
pub fn format_distance(distance_m: i64) -> String {
    if distance_m < 0 {
        return "-- km".to_string();
    }
    format!("{:.2} km", distance_m as f64 / 1_000.0)
}

/// Metres per second with two decimals, or `-- m/s` when negative.
pub fn format_average_speed(metres_per_second: f64) -> String {
    if metres_per_second < 0.0 {
        return "-- m/s".to_string();
    }
    format!("{metres_per_second:.2} m/s")
}

pub fn format_year(year: i32) -> String {
    year.to_string()
}

/// Full English month name for a zero based month index.
pub fn format_month(month: u32) -> &'static str {
    MONTH_NAMES[(month % 12) as usize]
}

/// Day of month with its ordinal suffix, e.g. `1st`, `22nd`, `14th`.
pub fn format_date_of_month(date: u32) -> String {
    let suffix = match date {
        1 | 21 | 31 => "st",
        2 | 22 => "nd",
        3 | 23 => "rd",
        _ => "th",
    };
    format!("{date}{suffix}")
}

/// `<day> <Month> <year>`, e.g. `14 April 2024`.
pub fn format_complete_date(year: i32, month: u32, date: u32) -> String {
    format!("{date} {} {year}", format_month(month))
}

/// `<hour>:<minute>` without zero padding, as the original recorded it.
pub fn format_time(hour: u32, minute: u32) -> String {
    format!("{hour}:{minute}")
}
