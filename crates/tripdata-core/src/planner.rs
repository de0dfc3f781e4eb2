//! Remote resource planning: which months to fetch, from where, to which file.
//!
//! The mapping from (taxi type, year, month) to remote URL and canonical
//! local filename is pure and stable; skip detection and resumption depend
//! on re-running a range resolving to the same local paths.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Utc};
use thiserror::Error;

/// Public host for monthly trip data files.
pub const DEFAULT_BASE_URL: &str = "https://d37ci6vzurychx.cloudfront.net/trip-data";

/// First year published in the columnar format. Earlier months are flat CSV
/// on the remote side and need no conversion after download.
pub const FORMAT_CUTOVER_YEAR: i32 = 2022;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("unknown taxi type: {0}")]
    InvalidResourceType(String),
    #[error("invalid collection range: {0}")]
    InvalidRange(String),
}

/// Known trip data resource types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaxiType {
    Yellow,
    Green,
    Fhv,
    Fhvhv,
}

impl TaxiType {
    /// Filename stem the remote source publishes under.
    pub fn stem(self) -> &'static str {
        match self {
            TaxiType::Yellow => "yellow_tripdata",
            TaxiType::Green => "green_tripdata",
            TaxiType::Fhv => "fhv_tripdata",
            TaxiType::Fhvhv => "fhvhv_tripdata",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaxiType::Yellow => "yellow",
            TaxiType::Green => "green",
            TaxiType::Fhv => "fhv",
            TaxiType::Fhvhv => "fhvhv",
        }
    }
}

impl fmt::Display for TaxiType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaxiType {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "yellow" => Ok(TaxiType::Yellow),
            "green" => Ok(TaxiType::Green),
            "fhv" => Ok(TaxiType::Fhv),
            "fhvhv" => Ok(TaxiType::Fhvhv),
            other => Err(PlanError::InvalidResourceType(other.to_string())),
        }
    }
}

/// One calendar month. Ordering is chronological.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The current UTC calendar month (default end of a collection range).
    pub fn current() -> Self {
        let now = Utc::now();
        Self {
            year: now.year(),
            month: now.month(),
        }
    }

    fn succ(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Months since year 0; distance between two valid YearMonths.
    fn ordinal(self) -> i64 {
        self.year as i64 * 12 + (self.month as i64 - 1)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.year, self.month)
    }
}

/// Format the remote source publishes a given month in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Parquet,
}

impl SourceFormat {
    /// Whether the downloaded file must be converted to the canonical flat format.
    pub fn needs_conversion(self) -> bool {
        matches!(self, SourceFormat::Parquet)
    }
}

/// One (taxi type, year, month) unit of collection work, fully resolved.
#[derive(Debug, Clone)]
pub struct CollectionTarget {
    pub taxi_type: TaxiType,
    pub month: YearMonth,
    pub remote_url: String,
    pub source_format: SourceFormat,
    /// Filename the raw download lands under before any conversion.
    pub download_filename: String,
    /// Canonical flat-format filename; basis for skip detection and results.
    pub local_filename: String,
}

/// Plan the targets for an inclusive month range. `end` defaults to the
/// current UTC month. Fails before producing anything on an inverted range
/// or out-of-range month.
pub fn plan(
    base_url: &str,
    taxi_type: TaxiType,
    start: YearMonth,
    end: Option<YearMonth>,
) -> Result<MonthPlan, PlanError> {
    let end = end.unwrap_or_else(YearMonth::current);
    for ym in [start, end] {
        if !(1..=12).contains(&ym.month) {
            return Err(PlanError::InvalidRange(format!("month out of range: {ym}")));
        }
    }
    if end < start {
        return Err(PlanError::InvalidRange(format!(
            "end {end} precedes start {start}"
        )));
    }
    Ok(MonthPlan {
        base_url: base_url.trim_end_matches('/').to_string(),
        taxi_type,
        next: Some(start),
        end,
    })
}

/// Lazy, chronologically ascending sequence of targets, inclusive of both
/// endpoints.
#[derive(Debug, Clone)]
pub struct MonthPlan {
    base_url: String,
    taxi_type: TaxiType,
    next: Option<YearMonth>,
    end: YearMonth,
}

impl MonthPlan {
    /// Number of targets remaining.
    pub fn len(&self) -> usize {
        match self.next {
            Some(next) => (self.end.ordinal() - next.ordinal() + 1) as usize,
            None => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.next.is_none()
    }
}

impl Iterator for MonthPlan {
    type Item = CollectionTarget;

    fn next(&mut self) -> Option<Self::Item> {
        let month = self.next?;
        self.next = if month < self.end {
            Some(month.succ())
        } else {
            None
        };
        Some(resolve_target(&self.base_url, self.taxi_type, month))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl ExactSizeIterator for MonthPlan {}

fn resolve_target(base_url: &str, taxi_type: TaxiType, month: YearMonth) -> CollectionTarget {
    let canonical = format!("{}_{}.csv", taxi_type.stem(), month);
    if month.year >= FORMAT_CUTOVER_YEAR {
        let remote_name = format!("{}_{}.parquet", taxi_type.stem(), month);
        CollectionTarget {
            taxi_type,
            month,
            remote_url: format!("{base_url}/{remote_name}"),
            source_format: SourceFormat::Parquet,
            download_filename: remote_name,
            local_filename: canonical,
        }
    } else {
        CollectionTarget {
            taxi_type,
            month,
            remote_url: format!("{base_url}/{canonical}"),
            source_format: SourceFormat::Csv,
            download_filename: canonical.clone(),
            local_filename: canonical,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_length_matches_month_distance() {
        let cases = [
            ((2021, 1), (2021, 1), 1),
            ((2021, 11), (2021, 12), 2),
            ((2020, 1), (2020, 12), 12),
            ((2019, 11), (2021, 2), 16),
        ];
        for ((sy, sm), (ey, em), expected) in cases {
            let plan = plan(
                DEFAULT_BASE_URL,
                TaxiType::Yellow,
                YearMonth::new(sy, sm),
                Some(YearMonth::new(ey, em)),
            )
            .unwrap();
            assert_eq!(plan.len(), expected);
            assert_eq!(plan.count(), expected);
        }
    }

    #[test]
    fn plan_is_strictly_chronological_and_inclusive() {
        let months: Vec<YearMonth> = plan(
            DEFAULT_BASE_URL,
            TaxiType::Green,
            YearMonth::new(2021, 10),
            Some(YearMonth::new(2022, 3)),
        )
        .unwrap()
        .map(|t| t.month)
        .collect();
        assert_eq!(months.first(), Some(&YearMonth::new(2021, 10)));
        assert_eq!(months.last(), Some(&YearMonth::new(2022, 3)));
        for pair in months.windows(2) {
            assert!(pair[0] < pair[1], "{} should precede {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn cutover_switches_remote_format() {
        let targets: Vec<CollectionTarget> = plan(
            "http://example.test/trip-data/",
            TaxiType::Yellow,
            YearMonth::new(2021, 12),
            Some(YearMonth::new(2022, 1)),
        )
        .unwrap()
        .collect();

        let legacy = &targets[0];
        assert_eq!(legacy.source_format, SourceFormat::Csv);
        assert!(!legacy.source_format.needs_conversion());
        assert_eq!(
            legacy.remote_url,
            "http://example.test/trip-data/yellow_tripdata_2021-12.csv"
        );
        assert_eq!(legacy.download_filename, legacy.local_filename);

        let columnar = &targets[1];
        assert_eq!(columnar.source_format, SourceFormat::Parquet);
        assert!(columnar.source_format.needs_conversion());
        assert_eq!(
            columnar.remote_url,
            "http://example.test/trip-data/yellow_tripdata_2022-01.parquet"
        );
        assert_eq!(columnar.download_filename, "yellow_tripdata_2022-01.parquet");
        assert_eq!(columnar.local_filename, "yellow_tripdata_2022-01.csv");
    }

    #[test]
    fn resolution_is_stable_across_runs() {
        let one = resolve_target(DEFAULT_BASE_URL, TaxiType::Fhvhv, YearMonth::new(2023, 7));
        let two = resolve_target(DEFAULT_BASE_URL, TaxiType::Fhvhv, YearMonth::new(2023, 7));
        assert_eq!(one.remote_url, two.remote_url);
        assert_eq!(one.local_filename, two.local_filename);
        assert_eq!(one.local_filename, "fhvhv_tripdata_2023-07.csv");
    }

    #[test]
    fn inverted_range_is_rejected() {
        let err = plan(
            DEFAULT_BASE_URL,
            TaxiType::Yellow,
            YearMonth::new(2022, 5),
            Some(YearMonth::new(2022, 1)),
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::InvalidRange(_)));
    }

    #[test]
    fn out_of_range_month_is_rejected() {
        let err = plan(
            DEFAULT_BASE_URL,
            TaxiType::Yellow,
            YearMonth::new(2022, 13),
            Some(YearMonth::new(2023, 1)),
        )
        .unwrap_err();
        assert!(matches!(err, PlanError::InvalidRange(_)));
    }

    #[test]
    fn unknown_taxi_type_is_rejected() {
        let err = "purple".parse::<TaxiType>().unwrap_err();
        assert_eq!(err, PlanError::InvalidResourceType("purple".to_string()));
        assert_eq!("yellow".parse::<TaxiType>().unwrap(), TaxiType::Yellow);
        assert_eq!("fhv".parse::<TaxiType>().unwrap(), TaxiType::Fhv);
    }

    #[test]
    fn end_defaults_to_current_month() {
        let start = YearMonth::new(2020, 1);
        let targets: Vec<CollectionTarget> =
            plan(DEFAULT_BASE_URL, TaxiType::Yellow, start, None)
                .unwrap()
                .collect();
        assert!(!targets.is_empty());
        assert_eq!(targets.last().unwrap().month, YearMonth::current());
    }
}
