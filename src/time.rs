use chrono::{DateTime, Utc};

/// Formats a timestamp for the `Date:` header of an outgoing email
/// ```
/// # use chrono::{TimeZone, Utc};
/// # use maygasse_apply::time::email_date;
/// let date = Utc.with_ymd_and_hms(2024, 3, 11, 12, 1, 3).unwrap();
///
/// assert_eq!(
///     email_date(&date),
///     "Mon, 11 Mar 2024 12:01:03 +0000",
///     "A valid date wasn't formatted properly"
/// );
/// ```
pub fn email_date(date: &DateTime<Utc>) -> String {
    date.to_rfc2822()
}

/// Milliseconds since the Unix epoch, clamped at zero for earlier dates.
pub fn epoch_millis(date: &DateTime<Utc>) -> u64 {
    u64::try_from(date.timestamp_millis()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    #[test]
    fn email_date_is_utc() {
        use super::email_date;
        let date = Utc.with_ymd_and_hms(2021, 12, 24, 9, 5, 0).unwrap();

        assert_eq!(
            email_date(&date),
            "Fri, 24 Dec 2021 09:05:00 +0000",
            "A valid date wasn't formatted properly"
        );
    }

    #[test]
    fn epoch_millis_keeps_milliseconds() {
        use super::epoch_millis;
        let date = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();

        assert_eq!(epoch_millis(&date), 1_700_000_000_123);
    }

    #[test]
    fn epoch_millis_before_epoch() {
        use super::epoch_millis;
        let date = Utc.with_ymd_and_hms(1969, 12, 31, 23, 59, 59).unwrap();

        assert_eq!(epoch_millis(&date), 0);
    }
}
