use anyhow::{anyhow, Result};
use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use tokio::time::Instant;

/// Layout of `created_on` / `expires_on` columns in the token log.
pub const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current UTC time truncated to whole seconds, so it survives a trip through the store.
pub fn now_utc() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}

pub fn format_store_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(STORE_TIMESTAMP_FORMAT).to_string()
}

pub fn parse_store_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw.trim(), STORE_TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| anyhow!("invalid timestamp '{}': {}", raw, e))
}

pub fn get_instant() -> Instant {
    Instant::now()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn store_timestamp_round_trip() {
        let ts = Utc.with_ymd_and_hms(2016, 3, 12, 9, 15, 0).unwrap();
        let raw = format_store_timestamp(&ts);
        assert_eq!(raw, "2016-03-12 09:15:00");
        assert_eq!(parse_store_timestamp(&raw).unwrap(), ts);
    }

    #[test]
    fn garbage_timestamp_is_rejected() {
        assert!(parse_store_timestamp("tomorrow-ish").is_err());
    }
}
