//! Filter predicates over the report table
//!
//! Filters are plain values rendered into a `QueryBuilder`; user input only
//! ever reaches the server as bound parameters.

use std::fmt;
use std::str::FromStr;

use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use chrono::TimeZone;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use sqlx::Postgres;
use sqlx::QueryBuilder;

use crate::LabRagError;
use crate::Result;

/// Column list shared by every statement that returns reports
pub const REPORT_COLUMNS: &str = "id, name, test_name, result, unit, ref_range, flag, timestamp";

/// How the subject name is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameMatch {
    /// `name = value`
    #[default]
    Exact,
    /// Case-sensitive substring, `name LIKE '%value%'`
    Contains,
}

impl FromStr for NameMatch {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "exact" => Ok(Self::Exact),
            "contains" | "substring" => Ok(Self::Contains),
            other => Err(format!("unknown name match '{other}' (expected exact or contains)")),
        }
    }
}

/// How the end of a date range is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndBoundary {
    /// Everything up to the end of the end date's day is included
    #[default]
    WholeDay,
    /// The end is an exact timestamp, included
    Exact,
}

impl FromStr for EndBoundary {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "whole_day" | "day" => Ok(Self::WholeDay),
            "exact" => Ok(Self::Exact),
            other => Err(format!(
                "unknown end boundary '{other}' (expected whole-day or exact)"
            )),
        }
    }
}

impl fmt::Display for EndBoundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WholeDay => write!(f, "whole-day"),
            Self::Exact => write!(f, "exact"),
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultOrder {
    /// Whatever order the server returns
    #[default]
    Storage,
    NewestFirst,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameFilter {
    pub value: String,
    #[serde(default)]
    pub mode: NameMatch,
}

/// Closed interval on the report timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub end_boundary: EndBoundary,
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, end_boundary: EndBoundary) -> Result<Self> {
        if start > end {
            return Err(LabRagError::InvalidInput(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(Self {
            start,
            end,
            end_boundary,
        })
    }

    /// The value compared against `timestamp` at the upper end
    ///
    /// For `WholeDay` this is midnight after the end date and the comparison
    /// is strict; for `Exact` it is `end` itself, compared inclusively.
    #[must_use]
    pub fn upper_bound(&self) -> DateTime<Utc> {
        match self.end_boundary {
            EndBoundary::Exact => self.end,
            EndBoundary::WholeDay => self
                .end
                .date_naive()
                .succ_opt()
                .and_then(|day| day.and_hms_opt(0, 0, 0))
                .map_or(self.end, |midnight| Utc.from_utc_datetime(&midnight)),
        }
    }

    const fn upper_operator(&self) -> &'static str {
        match self.end_boundary {
            EndBoundary::WholeDay => " AND timestamp < ",
            EndBoundary::Exact => " AND timestamp <= ",
        }
    }
}

/// Selection over the report table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub name: Option<NameFilter>,
    #[serde(default)]
    pub range: Option<DateRange>,
    #[serde(default)]
    pub order: ResultOrder,
    #[serde(default)]
    pub limit: Option<i64>,
}

impl ReportQuery {
    /// Every row, storage order
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, value: impl Into<String>, mode: NameMatch) -> Self {
        self.name = Some(NameFilter {
            value: value.into(),
            mode,
        });
        self
    }

    #[must_use]
    pub fn within(mut self, range: DateRange) -> Self {
        self.range = Some(range);
        self
    }

    #[must_use]
    pub fn ordered(mut self, order: ResultOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use]
    pub fn newest_first(self) -> Self {
        self.ordered(ResultOrder::NewestFirst)
    }

    #[must_use]
    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            if name.value.trim().is_empty() {
                return Err(LabRagError::InvalidInput(
                    "name filter must not be empty".to_string(),
                ));
            }
        }
        if let Some(range) = &self.range {
            if range.start > range.end {
                return Err(LabRagError::InvalidInput(format!(
                    "start {} is after end {}",
                    range.start, range.end
                )));
            }
        }
        if matches!(self.limit, Some(limit) if limit <= 0) {
            return Err(LabRagError::InvalidInput(
                "limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Render the SELECT statement with all predicates bound
    #[must_use]
    pub fn to_query_builder(&self) -> QueryBuilder<'static, Postgres> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {REPORT_COLUMNS} FROM blood_reports"));
        let mut joiner = " WHERE ";

        if let Some(name) = &self.name {
            builder.push(joiner);
            joiner = " AND ";
            match name.mode {
                NameMatch::Exact => {
                    builder.push("name = ").push_bind(name.value.clone());
                }
                NameMatch::Contains => {
                    builder
                        .push("name LIKE ")
                        .push_bind(format!("%{}%", escape_like(&name.value)))
                        .push(" ESCAPE '\\'");
                }
            }
        }

        if let Some(range) = &self.range {
            builder.push(joiner);
            builder
                .push("timestamp >= ")
                .push_bind(range.start)
                .push(range.upper_operator())
                .push_bind(range.upper_bound());
        }

        if self.order == ResultOrder::NewestFirst {
            builder.push(" ORDER BY timestamp DESC, id DESC");
        }

        if let Some(limit) = self.limit {
            builder.push(" LIMIT ").push_bind(limit);
        }

        builder
    }
}

/// Escape LIKE wildcards so user text is matched literally
fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Parse a date bound given as `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or RFC 3339
///
/// Dates and naive date-times are taken as UTC.
pub fn parse_date_bound(input: &str) -> Result<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Ok(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Ok(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&midnight));
        }
    }

    Err(LabRagError::InvalidInput(format!(
        "'{input}' is not a date (expected YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339)"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        parse_date_bound(s).unwrap()
    }

    #[test]
    fn test_all_has_no_predicates() {
        let builder = ReportQuery::all().to_query_builder();
        assert_eq!(
            builder.sql(),
            "SELECT id, name, test_name, result, unit, ref_range, flag, timestamp FROM blood_reports"
        );
    }

    #[test]
    fn test_exact_name_with_exact_range() {
        let range = DateRange::new(ts("2024-01-01"), ts("2024-01-31 12:00:00"), EndBoundary::Exact)
            .unwrap();
        let query = ReportQuery::all()
            .with_name("Jane Doe", NameMatch::Exact)
            .within(range);

        let builder = query.to_query_builder();
        assert!(builder.sql().ends_with(
            "FROM blood_reports WHERE name = $1 AND timestamp >= $2 AND timestamp <= $3"
        ));
    }

    #[test]
    fn test_contains_with_whole_day_newest_first() {
        let range =
            DateRange::new(ts("2024-01-01"), ts("2024-01-31"), EndBoundary::WholeDay).unwrap();
        let query = ReportQuery::all()
            .with_name("Doe", NameMatch::Contains)
            .within(range)
            .newest_first()
            .limit(5);

        let builder = query.to_query_builder();
        assert!(builder.sql().ends_with(
            "WHERE name LIKE $1 ESCAPE '\\' AND timestamp >= $2 AND timestamp < $3 \
             ORDER BY timestamp DESC, id DESC LIMIT $4"
        ));
    }

    #[test]
    fn test_range_only_uses_where() {
        let range = DateRange::new(ts("2024-01-01"), ts("2024-01-02"), EndBoundary::Exact).unwrap();
        let builder = ReportQuery::all().within(range).to_query_builder();
        assert!(builder
            .sql()
            .ends_with("FROM blood_reports WHERE timestamp >= $1 AND timestamp <= $2"));
    }

    #[test]
    fn test_user_text_never_inlined() {
        let query = ReportQuery::all().with_name("x'; DROP TABLE blood_reports; --", NameMatch::Exact);
        let builder = query.to_query_builder();
        assert!(!builder.sql().contains("DROP"));
    }

    #[test]
    fn test_whole_day_upper_bound_is_next_midnight() {
        let range = DateRange::new(
            ts("2024-02-28T00:00:00Z"),
            ts("2024-02-28 15:45:00"),
            EndBoundary::WholeDay,
        )
        .unwrap();
        assert_eq!(range.upper_bound(), ts("2024-02-29"));
    }

    #[test]
    fn test_exact_upper_bound_is_end() {
        let end = ts("2024-02-28 15:45:00");
        let range = DateRange::new(ts("2024-02-01"), end, EndBoundary::Exact).unwrap();
        assert_eq!(range.upper_bound(), end);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let err = DateRange::new(ts("2024-03-01"), ts("2024-02-01"), EndBoundary::Exact).unwrap_err();
        assert!(matches!(err, LabRagError::InvalidInput(_)));
    }

    #[test]
    fn test_validate() {
        assert!(ReportQuery::all().validate().is_ok());
        assert!(ReportQuery::all().with_name(" ", NameMatch::Exact).validate().is_err());
        assert!(ReportQuery::all().limit(0).validate().is_err());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_a\\b"), "50\\%\\_a\\\\b");
        assert_eq!(escape_like("Doe"), "Doe");
    }

    #[test]
    fn test_parse_date_bound_formats() {
        assert_eq!(ts("2024-05-01").to_rfc3339(), "2024-05-01T00:00:00+00:00");
        assert_eq!(ts("2024-05-01 08:30:00").to_rfc3339(), "2024-05-01T08:30:00+00:00");
        assert_eq!(ts("2024-05-01T10:30:00+02:00").to_rfc3339(), "2024-05-01T08:30:00+00:00");
        assert!(parse_date_bound("yesterday").is_err());
    }

    #[test]
    fn test_enum_parsing() {
        assert_eq!("whole-day".parse::<EndBoundary>().unwrap(), EndBoundary::WholeDay);
        assert_eq!("EXACT".parse::<EndBoundary>().unwrap(), EndBoundary::Exact);
        assert_eq!("contains".parse::<NameMatch>().unwrap(), NameMatch::Contains);
        assert!("fuzzy".parse::<NameMatch>().is_err());
    }
}
