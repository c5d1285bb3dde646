//! Alarm classification of channel readings.
//!
//! A value at or below the threshold usually means an inverter is not
//! producing. `Missing` is kept apart so "no data" never reads as "zero".

use crate::models::{AlarmStatus, ChannelStatus, Snapshot};

/// Minimum expected inverter output in watts.
pub const DEFAULT_THRESHOLD_W: f64 = 10.0;

pub fn status_for(value: Option<f64>, threshold: f64) -> AlarmStatus {
    match value {
        None => AlarmStatus::Missing,
        Some(v) if v <= threshold => AlarmStatus::Low,
        Some(_) => AlarmStatus::Ok,
    }
}

/// One status per reading, in the order the device reported them.
pub fn classify(snapshot: &Snapshot, threshold: f64) -> Vec<ChannelStatus> {
    snapshot
        .readings()
        .iter()
        .map(|reading| ChannelStatus {
            channel: reading.channel.clone(),
            value: reading.watts,
            status: status_for(reading.watts, threshold),
            observed_at: snapshot.timestamp,
        })
        .collect()
}
