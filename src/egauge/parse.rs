//! Decoding of the `cgi-bin/egauge?inst&tot` XML document.
//!
//! ```xml
//! <data serial="0x4d2f1a">
//!   <ts>1700000000</ts>
//!   <r t="P" n="Inv1"><v>123456</v><i>5.0</i></r>
//! </data>
//! ```

use chrono::{Offset, TimeZone, Utc};
use chrono_tz::Tz;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::debug;

use crate::error::FetchError;
use crate::models::Snapshot;

const UNNAMED_CHANNEL: &str = "Unknown";

#[derive(Debug, Deserialize)]
struct GaugeDocument {
    ts: String,
    #[serde(rename = "r", default)]
    rows: Vec<GaugeRow>,
}

#[derive(Debug, Deserialize)]
struct GaugeRow {
    #[serde(rename = "@n", default)]
    name: Option<String>,
    /// Instantaneous value.
    #[serde(default)]
    i: Option<String>,
}

pub fn parse_snapshot(body: &str, timezone: Tz) -> Result<Snapshot, FetchError> {
    ensure_single_root(body)?;
    let doc: GaugeDocument =
        quick_xml::de::from_str(body).map_err(|e| FetchError::Parse(e.to_string()))?;

    let raw_ts = doc.ts.trim();
    let epoch: i64 = raw_ts
        .parse()
        .map_err(|_| FetchError::Parse(format!("invalid ts '{}'", raw_ts)))?;
    let utc = Utc
        .timestamp_opt(epoch, 0)
        .single()
        .ok_or_else(|| FetchError::Parse(format!("ts {} out of range", epoch)))?;
    let local = utc.with_timezone(&timezone);
    let offset = local.offset().fix();

    let mut snapshot = Snapshot::new(local.with_timezone(&offset));
    for row in doc.rows {
        let name = row.name.unwrap_or_else(|| UNNAMED_CHANNEL.to_string());
        let watts = parse_watts(row.i.as_deref());
        if watts.is_none() {
            debug!(channel = %name, raw = ?row.i, "channel value missing or unparsable");
        }
        snapshot.insert(name, watts);
    }

    Ok(snapshot)
}

/// Reject bodies that are not one well-formed document: content after the
/// root element, a second root, or an unclosed root.
fn ensure_single_root(body: &str) -> Result<(), FetchError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut roots = 0usize;
    loop {
        let event = reader
            .read_event()
            .map_err(|e| FetchError::Parse(e.to_string()))?;
        match event {
            Event::Start(_) => {
                if depth == 0 {
                    roots += 1;
                }
                depth += 1;
            }
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Empty(_) if depth == 0 => roots += 1,
            Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
            Event::Eof => break,
            _ if depth == 0 => {
                return Err(FetchError::Parse(format!(
                    "content outside the root element at byte {}",
                    reader.buffer_position()
                )))
            }
            _ => {}
        }
        if roots > 1 {
            return Err(FetchError::Parse(format!(
                "second root element at byte {}",
                reader.buffer_position()
            )));
        }
    }

    if roots == 0 {
        return Err(FetchError::Parse("no root element".into()));
    }
    if depth > 0 {
        return Err(FetchError::Parse("unexpected end of document".into()));
    }
    Ok(())
}

fn parse_watts(raw: Option<&str>) -> Option<f64> {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|v| !v.is_nan())
}
