//! JSON payload sent by the hub in answer to a schedule request.
//!
//! Wire format:
//! ```text
//! {"entries": [
//!   {"from": "08:00",    "to": "09:00",    "data": {"setpoint": 21.0}},
//!   {"from": "20:00:00", "to": "01:00:00", "data": {"setpoint": "18"}}
//! ]}
//! ```
//!
//! Instant schedules omit `to`.  `"24:00"` is accepted as midnight.
//! Data values may be JSON numbers or numeric strings.  Only the shape is
//! checked here; ordering, overlap and channel rules are left to
//! [`validate_candidate`](super::validate_candidate).

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Result, ValidationError};
use crate::schedule::{ScheduleEntry, ScheduleKind};
use crate::time::TimeOfDay;

use super::{CandidateSchedule, ChannelValues};

/// Payloads above this size are refused unparsed.
pub const MAX_PAYLOAD_SIZE: usize = 8192;

#[derive(Deserialize)]
struct WirePayload {
    entries: Vec<WireEntry>,
}

#[derive(Deserialize)]
struct WireEntry {
    from: String,
    #[serde(default)]
    to: Option<String>,
    #[serde(default)]
    data: BTreeMap<String, Value>,
}

fn parse_time(text: &str) -> Result<TimeOfDay> {
    TimeOfDay::parse(text).ok_or_else(|| ValidationError::Malformed("bad time of day").into())
}

fn parse_value(value: &Value) -> Result<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ValidationError::Malformed("data value is not a number").into())
}

impl CandidateSchedule {
    /// Parse a hub payload for a schedule of `kind`.
    pub fn from_json(kind: ScheduleKind, text: &str) -> Result<Self> {
        if text.len() > MAX_PAYLOAD_SIZE {
            return Err(ValidationError::Malformed("payload too large").into());
        }
        let payload: WirePayload = serde_json::from_str(text)
            .map_err(|_| ValidationError::Malformed("invalid JSON payload"))?;

        let mut candidate = Self::default();
        for entry in &payload.entries {
            let start = parse_time(&entry.from)?;
            let parsed = match (kind, &entry.to) {
                (ScheduleKind::Interval, Some(to)) => ScheduleEntry::Interval {
                    start,
                    end: parse_time(to)?,
                },
                (ScheduleKind::Instant, None) => ScheduleEntry::Instant { at: start },
                _ => return Err(ValidationError::KindMismatch.into()),
            };
            candidate.entries.push(parsed);

            for (label, value) in &entry.data {
                let value = parse_value(value)?;
                match candidate.channels.iter_mut().find(|c| &c.label == label) {
                    Some(channel) => channel.values.push(value),
                    None => candidate.channels.push(ChannelValues {
                        label: label.clone(),
                        values: vec![value],
                    }),
                }
            }
        }
        Ok(candidate)
    }
}
