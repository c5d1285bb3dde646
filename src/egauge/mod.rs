pub mod client;
pub mod parse;

pub use client::{snapshot_url, SnapshotClient, SnapshotSource, DEFAULT_REQUEST_TIMEOUT, MAX_BODY_BYTES, SNAPSHOT_PATH};
pub use parse::parse_snapshot;

#[cfg(test)]
pub use client::MockSnapshotSource;
