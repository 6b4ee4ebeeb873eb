//! Backend capability detection and timestamp precision handling.
//!
//! The one capability that matters here is sub-second timestamp support,
//! decided from the backend's version string. The answer gates the DDL
//! (`timestamp(6)` vs `timestamp` columns) and every timestamp formatted
//! into a statement parameter.

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime, UtcOffset};

use crate::error::{Error, Result};

/// Statement issued to read the backend version string.
pub(crate) const VERSION_QUERY: &str = "SELECT version()";

const TS_MICROSECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:6]");

const TS_SECONDS: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

const TS_PARSE: &[BorrowedFormatItem<'static>] = format_description!(
    version = 2,
    "[year]-[month]-[day] [hour]:[minute]:[second][optional [.[subsecond]]]"
);

/// Decide sub-second support from a free-form version string.
///
/// The first three numeric components are scanned out of the string, so
/// `8.0.21`, `5.6.4-log` and `10.11.6-MariaDB` all parse. Fractional-second
/// storage arrived in 5.6.4; anything older stores whole seconds only.
/// A string without three numeric components is a fatal configuration error,
/// never a silent assumption of support.
pub(crate) fn microsecond_support(version: &str) -> Result<bool> {
    let (major, minor, patch) = parse_version_triplet(version)
        .ok_or_else(|| Error::VersionUnparseable(version.to_string()))?;

    let supported = match (major, minor) {
        (0..=4, _) => false,
        (5, 0..=5) => false,
        (5, 6) => patch >= 4,
        _ => true,
    };
    Ok(supported)
}

/// Scan the first three runs of digits out of a version string.
fn parse_version_triplet(version: &str) -> Option<(u32, u32, u32)> {
    let mut components = version
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<u32>().ok());

    let major = components.next()??;
    let minor = components.next()??;
    let patch = components.next()??;
    Some((major, minor, patch))
}

/// Format an instant for use as a statement parameter.
///
/// The instant is normalized to UTC first. Without sub-second support the
/// fractional suffix is dropped entirely, matching what the backend's
/// whole-second column would keep.
pub(crate) fn format_timestamp(ts: OffsetDateTime, microseconds: bool) -> Result<String> {
    let format = if microseconds { TS_MICROSECONDS } else { TS_SECONDS };
    ts.to_offset(UtcOffset::UTC)
        .format(format)
        .map_err(|e| Error::InvalidTimestamp(e.to_string()))
}

/// Parse a stored naive timestamp, reinterpreting it as UTC.
///
/// Stored timestamps carry no zone tag of their own; the store only ever
/// writes UTC, so that is what they are read back as.
pub(crate) fn parse_timestamp(text: &str) -> Result<OffsetDateTime> {
    PrimitiveDateTime::parse(text, TS_PARSE)
        .map(PrimitiveDateTime::assume_utc)
        .map_err(|_| Error::InvalidTimestamp(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn test_microsecond_support_decision_table() {
        assert!(microsecond_support("8.0.21").unwrap());
        assert!(!microsecond_support("5.6.3").unwrap());
        assert!(microsecond_support("5.6.4").unwrap());
        assert!(!microsecond_support("5.5.9").unwrap());
        assert!(!microsecond_support("4.1.22").unwrap());
        assert!(microsecond_support("5.7.44").unwrap());
    }

    #[test]
    fn test_microsecond_support_tolerates_suffixes() {
        assert!(microsecond_support("5.6.4-log").unwrap());
        assert!(microsecond_support("8.0.36-0ubuntu0.22.04.1").unwrap());
        assert!(microsecond_support("10.11.6-MariaDB").unwrap());
    }

    #[test]
    fn test_microsecond_support_fails_loudly_on_garbage() {
        let err = microsecond_support("beta").unwrap_err();
        assert!(matches!(err, Error::VersionUnparseable(_)));
        assert!(err.to_string().contains("beta"));

        assert!(microsecond_support("5.6").is_err());
        assert!(microsecond_support("").is_err());
    }

    #[test]
    fn test_format_timestamp_microseconds() {
        let ts = datetime!(2024-01-01 00:05:00.123456 UTC);
        assert_eq!(
            format_timestamp(ts, true).unwrap(),
            "2024-01-01 00:05:00.123456"
        );
    }

    #[test]
    fn test_format_timestamp_truncates_without_support() {
        let ts = datetime!(2024-01-01 00:05:00.999999 UTC);
        assert_eq!(format_timestamp(ts, false).unwrap(), "2024-01-01 00:05:00");
    }

    #[test]
    fn test_format_timestamp_normalizes_to_utc() {
        let ts = datetime!(2024-01-01 02:05:00 +02:00);
        assert_eq!(format_timestamp(ts, false).unwrap(), "2024-01-01 00:05:00");
    }

    #[test]
    fn test_parse_timestamp_with_and_without_fraction() {
        let ts = parse_timestamp("2024-01-01 00:05:00.123456").unwrap();
        assert_eq!(ts, datetime!(2024-01-01 00:05:00.123456 UTC));

        let ts = parse_timestamp("2024-01-01 00:05:00").unwrap();
        assert_eq!(ts, datetime!(2024-01-01 00:05:00 UTC));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert!(matches!(
            parse_timestamp("not a timestamp"),
            Err(Error::InvalidTimestamp(_))
        ));
    }
}
