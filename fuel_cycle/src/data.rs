//! Price observations and the daily median series built from them

use crate::error::{CycleError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, warn};

/// Default plausible retail band in cents per litre
pub const DEFAULT_PRICE_RANGE: (f64, f64) = (100.0, 300.0);

/// A single station price report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Station identifier
    pub station_id: String,
    /// Price in cents per litre
    pub price_cpl: f64,
    /// When the price was reported (timezone-naive)
    pub observed_at: NaiveDateTime,
}

impl PriceObservation {
    pub fn new(station_id: impl Into<String>, price_cpl: f64, observed_at: NaiveDateTime) -> Self {
        Self {
            station_id: station_id.into(),
            price_cpl,
            observed_at,
        }
    }

    /// Calendar day of the observation
    pub fn date(&self) -> NaiveDate {
        self.observed_at.date()
    }
}

/// Representative price for one calendar day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyPrice {
    pub date: NaiveDate,
    pub price_cpl: f64,
}

impl DailyPrice {
    pub fn new(date: NaiveDate, price_cpl: f64) -> Self {
        Self { date, price_cpl }
    }
}

/// Daily prices ordered by strictly increasing date.
///
/// Missing days are allowed and never interpolated.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailySeries {
    points: Vec<DailyPrice>,
}

impl DailySeries {
    /// Create a series, rejecting unordered or duplicate dates
    pub fn from_points(points: Vec<DailyPrice>) -> Result<Self> {
        if let Some(w) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(CycleError::DataError(format!(
                "Dates must be strictly increasing: {} is followed by {}",
                w[0].date, w[1].date
            )));
        }
        Ok(Self { points })
    }

    /// Create a gap-free series of consecutive days starting at `start`
    pub fn from_prices(start: NaiveDate, prices: &[f64]) -> Self {
        let points = start
            .iter_days()
            .zip(prices.iter())
            .map(|(date, &price_cpl)| DailyPrice { date, price_cpl })
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[DailyPrice] {
        &self.points
    }

    /// Prices in date order
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price_cpl).collect()
    }

    /// Dates in order
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Copy of the points in `range` as a new series
    pub fn slice(&self, range: std::ops::Range<usize>) -> Self {
        Self {
            points: self.points[range].to_vec(),
        }
    }

    /// The last `n` days (or all of them when shorter)
    pub fn tail(&self, n: usize) -> Self {
        let start = self.points.len().saturating_sub(n);
        self.slice(start..self.points.len())
    }

    pub fn into_points(self) -> Vec<DailyPrice> {
        self.points
    }
}

impl Deref for DailySeries {
    type Target = [DailyPrice];

    fn deref(&self) -> &Self::Target {
        &self.points
    }
}

/// Which raw timestamp field dates an observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampRule {
    /// The station's own report time only
    ReportedAt,
    /// The collector's scrape time only
    ScrapedAt,
    /// `reported_at` when present, otherwise `scraped_at`
    #[default]
    PreferReported,
}

/// Price feed row as delivered by the collector, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawPriceRecord {
    #[serde(default, alias = "SiteId")]
    pub site_id: Option<String>,
    #[serde(default, alias = "Price")]
    pub price_cpl: Option<String>,
    #[serde(default, alias = "TransactionDateUtc", alias = "TransactionDateutc")]
    pub reported_at: Option<String>,
    #[serde(default)]
    pub scraped_at: Option<String>,
}

impl RawPriceRecord {
    /// Validate into an observation; `None` for unparseable price or timestamp
    pub fn to_observation(&self, rule: TimestampRule) -> Option<PriceObservation> {
        let price_cpl = self
            .price_cpl
            .as_deref()
            .and_then(|p| p.trim().parse::<f64>().ok())
            .filter(|p| p.is_finite())?;

        let reported = self.reported_at.as_deref().and_then(parse_timestamp);
        let scraped = self.scraped_at.as_deref().and_then(parse_timestamp);
        let observed_at = match rule {
            TimestampRule::ReportedAt => reported,
            TimestampRule::ScrapedAt => scraped,
            TimestampRule::PreferReported => reported.or(scraped),
        }?;

        Some(PriceObservation {
            station_id: self.site_id.clone().unwrap_or_default().trim().to_string(),
            price_cpl,
            observed_at,
        })
    }
}

/// Parse the timestamp shapes seen in collector output.
///
/// Offsets are dropped after reading the wall-clock time they qualify.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }

    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Load observations from a collector CSV, skipping malformed rows
pub fn load_observations_csv<P: AsRef<Path>>(
    path: P,
    rule: TimestampRule,
) -> Result<Vec<PriceObservation>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path.as_ref())?;

    let mut observations = Vec::new();
    let mut skipped = 0usize;

    for row in reader.deserialize::<RawPriceRecord>() {
        match row.ok().and_then(|record| record.to_observation(rule)) {
            Some(observation) => observations.push(observation),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        debug!(
            skipped,
            kept = observations.len(),
            path = %path.as_ref().display(),
            "skipped malformed price rows"
        );
    }

    Ok(observations)
}

/// Reduces raw observations to one median price per calendar day
#[derive(Debug, Clone)]
pub struct DailySeriesBuilder {
    price_range: (f64, f64),
    timestamp_rule: TimestampRule,
}

impl Default for DailySeriesBuilder {
    fn default() -> Self {
        Self {
            price_range: DEFAULT_PRICE_RANGE,
            timestamp_rule: TimestampRule::default(),
        }
    }
}

impl DailySeriesBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the accepted price band (inclusive)
    pub fn with_price_range(mut self, min: f64, max: f64) -> Result<Self> {
        if !(min.is_finite() && max.is_finite()) || min > max {
            return Err(CycleError::InvalidParameter(format!(
                "Invalid price range [{}, {}]",
                min, max
            )));
        }
        self.price_range = (min, max);
        Ok(self)
    }

    pub fn with_timestamp_rule(mut self, rule: TimestampRule) -> Self {
        self.timestamp_rule = rule;
        self
    }

    pub fn timestamp_rule(&self) -> TimestampRule {
        self.timestamp_rule
    }

    fn in_range(&self, price: f64) -> bool {
        price.is_finite() && price >= self.price_range.0 && price <= self.price_range.1
    }

    /// Whether an observation falls inside the accepted price band
    pub fn accepts(&self, observation: &PriceObservation) -> bool {
        self.in_range(observation.price_cpl)
    }

    /// Observations inside the price band, for consumers that work on raw
    /// station reports rather than the daily median
    pub fn filter_observations(&self, observations: &[PriceObservation]) -> Vec<PriceObservation> {
        let kept: Vec<PriceObservation> = observations
            .iter()
            .filter(|obs| self.accepts(obs))
            .cloned()
            .collect();

        let rejected = observations.len() - kept.len();
        if rejected > 0 {
            debug!(rejected, "discarded observations outside the price band");
        }
        kept
    }

    /// Build the daily median series. No valid observations yields an empty series.
    pub fn build(&self, observations: &[PriceObservation]) -> DailySeries {
        let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
        let mut rejected = 0usize;

        for obs in observations {
            if self.accepts(obs) {
                by_day.entry(obs.date()).or_default().push(obs.price_cpl);
            } else {
                rejected += 1;
            }
        }

        if rejected > 0 {
            debug!(rejected, "discarded observations outside the price band");
        }

        let points = by_day
            .into_iter()
            .filter_map(|(date, prices)| {
                cycle_math::median(&prices)
                    .ok()
                    .map(|price_cpl| DailyPrice { date, price_cpl })
            })
            .collect();

        DailySeries { points }
    }

    /// Validate raw feed rows with this builder's timestamp rule, then build
    pub fn build_from_records(&self, records: &[RawPriceRecord]) -> DailySeries {
        let observations: Vec<PriceObservation> = records
            .iter()
            .filter_map(|r| r.to_observation(self.timestamp_rule))
            .collect();
        self.build(&observations)
    }
}

/// Daily series cache keyed by file path and modification time.
///
/// Owned by the caller; a changed file is re-read on the next `load`.
#[derive(Debug, Default)]
pub struct SeriesCache {
    builder: DailySeriesBuilder,
    entries: HashMap<PathBuf, (SystemTime, Arc<DailySeries>)>,
}

impl SeriesCache {
    pub fn new(builder: DailySeriesBuilder) -> Self {
        Self {
            builder,
            entries: HashMap::new(),
        }
    }

    /// Return the cached series for `path`, rebuilding it if the file changed
    pub fn load<P: AsRef<Path>>(&mut self, path: P) -> Result<Arc<DailySeries>> {
        let path = path.as_ref();
        let modified = std::fs::metadata(path)?.modified()?;

        if let Some((stamp, series)) = self.entries.get(path) {
            if *stamp == modified {
                return Ok(Arc::clone(series));
            }
        }

        let observations = load_observations_csv(path, self.builder.timestamp_rule())?;
        let series = Arc::new(self.builder.build(&observations));
        if series.is_empty() {
            warn!(path = %path.display(), "price file produced an empty daily series");
        }

        self.entries
            .insert(path.to_path_buf(), (modified, Arc::clone(&series)));
        Ok(series)
    }

    /// Drop the entry for `path`; returns whether one existed
    pub fn invalidate<P: AsRef<Path>>(&mut self, path: P) -> bool {
        self.entries.remove(path.as_ref()).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, day)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_build_takes_daily_median() {
        let observations = vec![
            PriceObservation::new("1", 180.0, at(1, 8)),
            PriceObservation::new("2", 182.0, at(1, 9)),
            PriceObservation::new("3", 250.0, at(1, 10)),
            PriceObservation::new("1", 175.0, at(2, 8)),
        ];

        let series = DailySeriesBuilder::new().build(&observations);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].price_cpl, 182.0);
        assert_eq!(series[1].price_cpl, 175.0);
    }

    #[test]
    fn test_build_discards_noise_and_handles_empty() {
        let observations = vec![
            PriceObservation::new("1", 999.9, at(1, 8)),
            PriceObservation::new("2", 0.0, at(1, 9)),
            PriceObservation::new("3", f64::NAN, at(1, 9)),
        ];
        assert!(DailySeriesBuilder::new().build(&observations).is_empty());
        assert!(DailySeriesBuilder::new().build(&[]).is_empty());
    }

    #[test]
    fn test_filter_observations_applies_band() {
        let observations = vec![
            PriceObservation::new("a", 169.0, at(2, 8)),
            PriceObservation::new("d", 999.9, at(2, 8)),
            PriceObservation::new("e", 0.0, at(2, 8)),
            PriceObservation::new("f", 300.0, at(2, 8)),
        ];
        let builder = DailySeriesBuilder::new();

        let kept = builder.filter_observations(&observations);
        let ids: Vec<&str> = kept.iter().map(|o| o.station_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "f"]);
        assert!(!builder.accepts(&observations[1]));

        let narrow = builder.with_price_range(150.0, 250.0).unwrap();
        assert_eq!(narrow.filter_observations(&observations).len(), 1);
    }

    #[test]
    fn test_build_keeps_gaps() {
        let observations = vec![
            PriceObservation::new("1", 180.0, at(1, 8)),
            PriceObservation::new("1", 178.0, at(4, 8)),
        ];
        let series = DailySeriesBuilder::new().build(&observations);
        assert_eq!(series.dates(), vec![at(1, 0).date(), at(4, 0).date()]);
    }

    #[test]
    fn test_record_timestamp_rules() {
        let record = RawPriceRecord {
            site_id: Some(" 61 ".into()),
            price_cpl: Some("179.9".into()),
            reported_at: None,
            scraped_at: Some("2024-03-02 07:15:00".into()),
        };

        assert!(record.to_observation(TimestampRule::ReportedAt).is_none());
        let obs = record.to_observation(TimestampRule::PreferReported).unwrap();
        assert_eq!(obs.station_id, "61");
        assert_eq!(obs.date(), at(2, 0).date());
    }

    #[test]
    fn test_record_rejects_non_numeric_price() {
        let record = RawPriceRecord {
            site_id: Some("1".into()),
            price_cpl: Some("n/a".into()),
            reported_at: Some("2024-03-02".into()),
            scraped_at: None,
        };
        assert!(record.to_observation(TimestampRule::default()).is_none());
    }

    #[test]
    fn test_parse_timestamp_shapes() {
        assert_eq!(parse_timestamp("2024-03-01T08:00:00"), Some(at(1, 8)));
        assert_eq!(
            parse_timestamp("2024-03-01 08:00:00.250").map(|t| t.date()),
            Some(at(1, 0).date())
        );
        assert_eq!(parse_timestamp("2024-03-01T08:00:00+10:00"), Some(at(1, 8)));
        assert_eq!(parse_timestamp("2024-03-01"), Some(at(1, 0)));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let d = at(1, 0).date();
        let points = vec![DailyPrice::new(d, 1.0), DailyPrice::new(d, 2.0)];
        assert!(DailySeries::from_points(points).is_err());
    }

    #[test]
    fn test_series_tail() {
        let series = DailySeries::from_prices(at(1, 0).date(), &[1.0, 2.0, 3.0]);
        assert_eq!(series.tail(2).prices(), vec![2.0, 3.0]);
        assert_eq!(series.tail(10).len(), 3);
    }
}
