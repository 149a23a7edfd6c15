use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
#[error("unknown date format: {0:?}")]
pub struct DateFormatError(pub String);

/// Accepted publication-date layouts, in the order they are tried.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PubDateLayout {
    /// `Mon, 02 Jan 2006 15:04:05 -0700`
    Rfc1123Z,
    /// `Mon, 02 Jan 2006 15:04:05 MST`
    Rfc1123,
    /// `02 Jan 06 15:04 -0700`
    Rfc822Z,
    /// `02 Jan 06 15:04 MST`
    Rfc822,
    /// `2006-01-02T15:04:05Z07:00`
    Rfc3339,
}

pub const LAYOUTS: [PubDateLayout; 5] = [
    PubDateLayout::Rfc1123Z,
    PubDateLayout::Rfc1123,
    PubDateLayout::Rfc822Z,
    PubDateLayout::Rfc822,
    PubDateLayout::Rfc3339,
];

impl PubDateLayout {
    pub fn parse(&self, raw: &str) -> Option<DateTime<FixedOffset>> {
        match self {
            PubDateLayout::Rfc1123Z => {
                DateTime::parse_from_str(strip_weekday(raw)?, "%d %b %Y %H:%M:%S %z").ok()
            }
            PubDateLayout::Rfc1123 => with_zone_name(strip_weekday(raw)?, "%d %b %Y %H:%M:%S"),
            PubDateLayout::Rfc822Z => DateTime::parse_from_str(raw, "%d %b %y %H:%M %z").ok(),
            PubDateLayout::Rfc822 => with_zone_name(raw, "%d %b %y %H:%M"),
            PubDateLayout::Rfc3339 => DateTime::parse_from_rfc3339(raw).ok(),
        }
    }
}

/// Try each layout in turn; the first match wins.
pub fn parse_pub_date(raw: &str) -> Result<DateTime<Utc>, DateFormatError> {
    let s = raw.trim();
    LAYOUTS
        .iter()
        .find_map(|layout| layout.parse(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| DateFormatError(raw.to_string()))
}

// The weekday is checked for shape only; feeds routinely get it wrong.
fn strip_weekday(s: &str) -> Option<&str> {
    let (day, rest) = s.split_once(", ")?;
    if day.len() == 3 && day.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(rest)
    } else {
        None
    }
}

fn with_zone_name(s: &str, fmt: &str) -> Option<DateTime<FixedOffset>> {
    let (head, zone) = s.rsplit_once(' ')?;
    let offset = zone_offset(zone)?;
    let naive = NaiveDateTime::parse_from_str(head, fmt).ok()?;
    offset.from_local_datetime(&naive).single()
}

// RFC 822 zone names; any other alphabetic abbreviation is read as UTC.
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    if zone.is_empty() || zone.len() > 5 || !zone.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let hours = match zone.to_ascii_uppercase().as_str() {
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => 0,
    };
    FixedOffset::east_opt(hours * 3600)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn instant() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2006-01-02T22:04:00Z").unwrap().with_timezone(&Utc)
    }

    #[test]
    fn every_layout_resolves_to_the_same_instant() {
        let cases = [
            (PubDateLayout::Rfc1123Z, "Mon, 02 Jan 2006 15:04:00 -0700"),
            (PubDateLayout::Rfc1123, "Mon, 02 Jan 2006 22:04:00 GMT"),
            (PubDateLayout::Rfc822Z, "02 Jan 06 15:04 -0700"),
            (PubDateLayout::Rfc822, "02 Jan 06 17:04 EST"),
            (PubDateLayout::Rfc3339, "2006-01-02T15:04:00-07:00"),
        ];
        for (layout, raw) in cases {
            assert!(layout.parse(raw).is_some(), "{layout:?} should accept {raw:?}");
            assert_eq!(parse_pub_date(raw).unwrap(), instant(), "{raw}");
        }
    }

    #[test]
    fn first_matching_layout_wins() {
        let raw = "Mon, 02 Jan 2006 15:04:00 -0700";
        let first = LAYOUTS.iter().find(|l| l.parse(raw).is_some());
        assert_eq!(first, Some(&PubDateLayout::Rfc1123Z));
        assert!(PubDateLayout::Rfc1123.parse(raw).is_none());
    }

    #[test]
    fn unknown_abbreviation_reads_as_utc() {
        let dt = parse_pub_date("Mon, 02 Jan 2006 22:04:00 XYZ").unwrap();
        assert_eq!(dt, instant());
    }

    #[test]
    fn mismatched_weekday_is_tolerated() {
        assert_eq!(parse_pub_date("Fri, 02 Jan 2006 22:04:00 UTC").unwrap(), instant());
    }

    #[test]
    fn unrecognised_strings_are_rejected() {
        for raw in ["", "yesterday", "2006/01/02 15:04", "Mon, 02 Jan 2006", "02 Jan 2006 15:04:00 +0000"] {
            assert_eq!(parse_pub_date(raw), Err(DateFormatError(raw.to_string())), "{raw:?}");
        }
    }
}
