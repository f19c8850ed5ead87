//! Streaming group-by over usage events
//!
//! Events are grouped by the hour they happened in (local or UTC clock) and
//! then by function identifier. Each line is looked at once; memory grows
//! with the number of distinct (hour, function) pairs, not with input size.

use super::event::{parse_line, LineOutcome, UsageEvent};
use super::types::{BucketZone, FunctionUsage, LineStats};
use chrono::{DateTime, FixedOffset};
use std::collections::{BTreeMap, HashMap};

/// Usage for one hour, keyed by function identifier
#[derive(Debug, Clone)]
pub struct HourBucket {
    /// Start of the hour in the aggregator's zone
    pub start: DateTime<FixedOffset>,
    functions: HashMap<String, FunctionUsage>,
    kinds: HashMap<String, String>,
}

impl HourBucket {
    fn new(start: DateTime<FixedOffset>) -> Self {
        Self {
            start,
            functions: HashMap::new(),
            kinds: HashMap::new(),
        }
    }

    /// Per-function counters in this hour
    pub fn functions(&self) -> &HashMap<String, FunctionUsage> {
        &self.functions
    }

    /// Function kind (query, mutation, ...) if any event reported it
    pub fn kind_of(&self, function: &str) -> Option<&str> {
        self.kinds.get(function).map(String::as_str)
    }

    /// Sum of every function's counters
    pub fn totals(&self) -> FunctionUsage {
        self.functions
            .values()
            .fold(FunctionUsage::default(), |mut acc, usage| {
                acc.merge(usage);
                acc
            })
    }

    fn add(&mut self, event: &UsageEvent) {
        self.functions
            .entry(event.function.clone())
            .or_default()
            .merge(&event.usage);

        if let Some(kind) = &event.kind {
            self.kinds
                .entry(event.function.clone())
                .or_insert_with(|| kind.clone());
        }
    }
}

/// Accumulates usage events into hour buckets
#[derive(Debug, Clone)]
pub struct Aggregator {
    zone: BucketZone,
    /// Keyed by the bucket start as a Unix timestamp, so iteration is chronological
    buckets: BTreeMap<i64, HourBucket>,
    stats: LineStats,
}

impl Aggregator {
    pub fn new(zone: BucketZone) -> Self {
        Self {
            zone,
            buckets: BTreeMap::new(),
            stats: LineStats::default(),
        }
    }

    pub fn zone(&self) -> BucketZone {
        self.zone
    }

    /// Parse one raw line and fold it in if it is a usage event
    ///
    /// Returns true when the line contributed to a bucket.
    pub fn ingest_line(&mut self, line: &str) -> bool {
        self.stats.lines += 1;

        match parse_line(line) {
            LineOutcome::Event(event) => {
                self.record(&event);
                true
            }
            LineOutcome::Irrelevant => {
                self.stats.irrelevant += 1;
                false
            }
            LineOutcome::Malformed => {
                tracing::trace!(line = self.stats.lines, "Skipping malformed line");
                self.stats.malformed += 1;
                false
            }
        }
    }

    /// Record a line that could not even be decoded as text
    pub fn ingest_undecodable(&mut self) {
        self.stats.lines += 1;
        self.stats.malformed += 1;
    }

    /// Fold a parsed event into its hour bucket
    pub fn record(&mut self, event: &UsageEvent) {
        let start = self.zone.hour_start(event.timestamp);

        self.buckets
            .entry(start.timestamp())
            .or_insert_with(|| HourBucket::new(start))
            .add(event);

        self.stats.events += 1;
    }

    /// Buckets in chronological order
    pub fn buckets(&self) -> impl Iterator<Item = &HourBucket> {
        self.buckets.values()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn stats(&self) -> LineStats {
        self.stats
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
