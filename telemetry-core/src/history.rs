//! Record history and the views published to consumers
//!
//! The history is replaced wholesale on every successful fetch. Everything a
//! consumer sees is derived from it at publish time.

use crate::types::{CanonicalField, CanonicalRecord};
use chrono::{DateTime, Local};
use serde::Serialize;

/// Ordered normalized records in source row order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordHistory {
    records: Vec<CanonicalRecord>,
}

impl RecordHistory {
    pub fn new(records: Vec<CanonicalRecord>) -> Self {
        Self { records }
    }

    /// Replace the whole history with a new batch
    pub fn replace(&mut self, records: Vec<CanonicalRecord>) {
        self.records = records;
    }

    pub fn records(&self) -> &[CanonicalRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// The most recent record (the last one in source order)
    pub fn latest(&self) -> Option<&CanonicalRecord> {
        self.records.last()
    }

    /// The trailing `size` records, oldest first
    pub fn trailing(&self, size: usize) -> &[CanonicalRecord] {
        let start = self.records.len().saturating_sub(size);
        &self.records[start..]
    }

    /// The trailing `size` records, most recent first
    pub fn most_recent_first(&self, size: usize) -> Vec<CanonicalRecord> {
        self.trailing(size).iter().rev().cloned().collect()
    }
}

/// Labels and values of one metric over the trend window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendSeries {
    pub field: CanonicalField,
    pub labels: Vec<String>,
    pub values: Vec<Option<f64>>,
}

impl TrendSeries {
    /// Smallest and largest present value
    pub fn range(&self) -> Option<(f64, f64)> {
        self.values.iter().flatten().fold(None, |acc, v| match acc {
            None => Some((*v, *v)),
            Some((lo, hi)) => Some((lo.min(*v), hi.max(*v))),
        })
    }

    /// Last present value
    pub fn last_value(&self) -> Option<f64> {
        self.values.iter().rev().flatten().next().copied()
    }
}

/// Everything consumers receive after a successful cycle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Publication {
    pub history: Vec<CanonicalRecord>,
    pub latest: Option<CanonicalRecord>,
    /// Trailing records for trend charts, oldest first
    pub trend_window: Vec<CanonicalRecord>,
    /// Trailing records for tables, most recent first
    pub display_window: Vec<CanonicalRecord>,
    pub published_at: DateTime<Local>,
}

impl Publication {
    /// Derive all views from the history
    pub fn from_history(
        history: &RecordHistory,
        trend_size: usize,
        display_size: usize,
        published_at: DateTime<Local>,
    ) -> Self {
        Self {
            history: history.records().to_vec(),
            latest: history.latest().cloned(),
            trend_window: history.trailing(trend_size).to_vec(),
            display_window: history.most_recent_first(display_size),
            published_at,
        }
    }

    pub fn row_count(&self) -> usize {
        self.history.len()
    }

    /// One numeric metric over the trend window, labelled by timestamp
    pub fn trend_series(&self, field: CanonicalField) -> TrendSeries {
        TrendSeries {
            field,
            labels: self.trend_window.iter().map(|r| r.timestamp.clone()).collect(),
            values: self.trend_window.iter().map(|r| r.numeric(field)).collect(),
        }
    }

    /// Half-donut gauge data for the latest speed: `[speed, 100 - speed]`
    pub fn speed_gauge(&self) -> [f64; 2] {
        let speed = self.latest.as_ref().and_then(|r| r.speed).unwrap_or(0.0);
        [speed, 100.0 - speed]
    }
}
