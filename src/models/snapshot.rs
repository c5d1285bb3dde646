use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Instants are kept in the configured display timezone, as a fixed offset.
pub type Timestamp = DateTime<FixedOffset>;

/// One channel value in watts. `None` marks a missing or unparsable value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub channel: String,
    pub watts: Option<f64>,
}

/// A point-in-time capture of every channel reported by a device.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub timestamp: Timestamp,
    readings: Vec<Reading>,
}

impl Snapshot {
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            readings: Vec::new(),
        }
    }

    /// Record a channel value. A repeated channel keeps its first position and
    /// takes the latest value, so channel names stay unique.
    pub fn insert(&mut self, channel: impl Into<String>, watts: Option<f64>) {
        let channel = channel.into();
        match self.readings.iter_mut().find(|r| r.channel == channel) {
            Some(existing) => existing.watts = watts,
            None => self.readings.push(Reading { channel, watts }),
        }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn get(&self, channel: &str) -> Option<&Reading> {
        self.readings.iter().find(|r| r.channel == channel)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}
