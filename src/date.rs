use chrono::{DateTime, Local, TimeZone};
use std::fmt::Display;

const FILE_SYSTEM_SAFE: &str = "%Y-%m-%d-%H-%M-%S";

/// Formats `date` as `YYYY-MM-DD-HH-MM-SS`, in the date's own time zone.
///
/// Every field is zero-padded and only hyphens separate them, so the result
/// can be used directly as a file or directory name.
pub fn format_date_as_file_system_safe<Tz>(date: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    date.format(FILE_SYSTEM_SAFE).to_string()
}

/// Current local time in file-system-safe form.
pub fn file_system_safe_now() -> String {
    format_date_as_file_system_safe(&Local::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    #[test]
    fn pads_every_field() {
        let date = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 2).unwrap();
        assert_eq!(format_date_as_file_system_safe(&date), "2024-03-07-09-05-02");
    }

    #[test]
    fn uses_the_dates_own_offset() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let date = offset.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
        assert_eq!(format_date_as_file_system_safe(&date), "2023-12-31-23-59-59");
    }

    #[test]
    fn now_has_six_hyphenated_fields() {
        let stamp = file_system_safe_now();
        let fields: Vec<&str> = stamp.split('-').collect();
        assert_eq!(fields.len(), 6, "unexpected stamp: {stamp}");
        assert_eq!(fields[0].len(), 4);
        assert!(fields[1..].iter().all(|f| f.len() == 2));
    }
}
