//! Event time model
//!
//! Every comparison between events goes through [`EventTimeModel`]; raw
//! date strings are never compared directly.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use whenis_domain::{EventRecord, MalformedTimeError, PartialInstant, TimeField};

/// Normalizes [`PartialInstant`]s into UTC instants.
///
/// Full timestamps are RFC 3339 (a missing offset means UTC). Date-only
/// values resolve to midnight in the configured zone.
#[derive(Debug, Clone, Copy)]
pub struct EventTimeModel {
    tz: Tz,
}

impl Default for EventTimeModel {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl EventTimeModel {
    /// Model resolving all-day dates in `tz`.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Zone used for date-only values.
    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Start of `record` as a UTC instant; the sort key for merged results.
    pub fn start_instant(
        &self,
        record: &EventRecord,
    ) -> Result<DateTime<Utc>, MalformedTimeError> {
        self.resolve(record, TimeField::Start)
    }

    /// End of `record` as a UTC instant.
    pub fn end_instant(&self, record: &EventRecord) -> Result<DateTime<Utc>, MalformedTimeError> {
        self.resolve(record, TimeField::End)
    }

    fn resolve(
        &self,
        record: &EventRecord,
        field: TimeField,
    ) -> Result<DateTime<Utc>, MalformedTimeError> {
        let value = match field {
            TimeField::Start => &record.start,
            TimeField::End => &record.end,
        };

        self.normalize(value).map_err(|reason| MalformedTimeError {
            event_id: record.id.clone(),
            field,
            value: value.raw().to_string(),
            reason,
        })
    }

    /// Timestamp first, date second. Neither present is an error, never a
    /// zero instant.
    pub fn normalize(&self, value: &PartialInstant) -> Result<DateTime<Utc>, String> {
        let timestamp = value.date_time.as_deref().map(str::trim).filter(|s| !s.is_empty());
        let date = value.date.as_deref().map(str::trim).filter(|s| !s.is_empty());

        match (timestamp, date) {
            (Some(ts), None) => parse_timestamp(ts),
            (Some(ts), Some(day)) => parse_timestamp(ts).or_else(|_| self.local_midnight(day)),
            (None, Some(day)) => self.local_midnight(day),
            (None, None) => Err("neither dateTime nor date is set".to_string()),
        }
    }

    fn local_midnight(&self, value: &str) -> Result<DateTime<Utc>, String> {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|e| format!("invalid date '{value}': {e}"))?;

        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| format!("invalid date '{value}': could not derive midnight"))?;

        // Zones that skip midnight on a DST change start the day at 01:00.
        self.tz
            .from_local_datetime(&midnight)
            .earliest()
            .or_else(|| {
                date.and_hms_opt(1, 0, 0)
                    .and_then(|shifted| self.tz.from_local_datetime(&shifted).earliest())
            })
            .map(|local| local.with_timezone(&Utc))
            .ok_or_else(|| format!("date '{value}' has no midnight in {}", self.tz))
    }
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    let has_explicit_offset = value.ends_with('Z')
        || value.ends_with('z')
        || value
            .rfind('T')
            .is_some_and(|idx| value[idx + 1..].chars().any(|c| matches!(c, '+' | '-')));

    let candidate = if has_explicit_offset { value.to_string() } else { format!("{value}Z") };

    DateTime::parse_from_rfc3339(&candidate)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid timestamp '{value}': {e}"))
}
