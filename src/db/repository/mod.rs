pub mod access_request;
pub mod alert;
pub mod assignment;
pub mod audit;

use chrono::NaiveDateTime;

/// Storage format for timestamps. Matches SQLite's datetime('now') output so
/// stored values compare correctly against clock expressions in SQL.
pub(crate) const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub(crate) fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TS_FORMAT).unwrap_or_default()
}

pub(crate) fn format_opt_ts(ts: &Option<NaiveDateTime>) -> Option<String> {
    ts.as_ref().map(format_ts)
}

pub(crate) fn parse_opt_ts(s: Option<String>) -> Option<NaiveDateTime> {
    s.as_deref().map(parse_ts)
}

/// Current UTC time, truncated to storage precision.
pub(crate) fn now_utc() -> NaiveDateTime {
    parse_ts(&format_ts(&chrono::Utc::now().naive_utc()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_round_trip() {
        let now = now_utc();
        assert_eq!(parse_ts(&format_ts(&now)), now);
    }

    #[test]
    fn optional_timestamp_round_trip() {
        assert_eq!(parse_opt_ts(None), None);
        let now = now_utc();
        assert_eq!(parse_opt_ts(format_opt_ts(&Some(now))), Some(now));
    }
}
