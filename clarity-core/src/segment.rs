//! Scored segments and their input boundary
//!
//! Upstream analysis hands segments over as loosely-typed JSON records. They
//! are normalized into `Segment` once, here, and everything downstream works
//! on the normalized type only.
//!
//! Boundary rules:
//! - `segment_id`, `start_sec`, and `end_sec` are required; a record missing
//!   one of them is rejected with a descriptive error
//! - `start_sec < end_sec`, both finite, `end_sec` at most `MAX_TIME_SEC`
//! - A missing or non-numeric `risk` is coerced to 0.0
//! - `signals_triggered` defaults to empty

use crate::signal::Signal;
use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Latest time accepted anywhere on the input boundary (24 hours)
pub const MAX_TIME_SEC: f64 = 86_400.0;

/// One scored time slice of the presentation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct Segment {
    pub segment_id: String,
    pub start_sec: f64,
    pub end_sec: f64,
    pub risk: f64,
    pub signals_triggered: Vec<Signal>,
}

impl Segment {
    pub fn new(
        segment_id: impl Into<String>,
        start_sec: f64,
        end_sec: f64,
        risk: f64,
        signals_triggered: Vec<Signal>,
    ) -> Result<Self> {
        let segment_id = segment_id.into();
        validate_span(&segment_id, start_sec, end_sec)?;
        Ok(Segment {
            segment_id,
            start_sec,
            end_sec,
            risk: if risk.is_nan() { 0.0 } else { risk },
            signals_triggered,
        })
    }

    /// True when `time` falls inside the closed interval [start, end]
    pub fn contains(&self, time: f64) -> bool {
        self.start_sec <= time && time <= self.end_sec
    }
}

/// Segment as received from upstream, before validation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSegment {
    #[serde(default)]
    pub segment_id: Option<Value>,
    #[serde(default)]
    pub start_sec: Option<f64>,
    #[serde(default)]
    pub end_sec: Option<f64>,
    #[serde(default)]
    pub risk: Option<Value>,
    #[serde(default)]
    pub signals_triggered: Vec<String>,
}

impl TryFrom<RawSegment> for Segment {
    type Error = anyhow::Error;

    fn try_from(raw: RawSegment) -> Result<Self> {
        let segment_id = match raw.segment_id.as_ref() {
            Some(value) => id_from_value(value)
                .with_context(|| format!("segment_id must be a string or integer (got {})", value))?,
            None => anyhow::bail!("segment is missing required field segment_id"),
        };
        let Some(start_sec) = raw.start_sec else {
            anyhow::bail!("segment {} is missing required field start_sec", segment_id);
        };
        let Some(end_sec) = raw.end_sec else {
            anyhow::bail!("segment {} is missing required field end_sec", segment_id);
        };

        let risk = coerce_risk(raw.risk.as_ref());
        let signals_triggered = raw
            .signals_triggered
            .into_iter()
            .map(Signal::from)
            .collect();

        Segment::new(segment_id, start_sec, end_sec, risk, signals_triggered)
    }
}

/// Parse and validate a JSON array of segment records
pub fn parse_segments(json: &str) -> Result<Vec<Segment>> {
    let raw: Vec<RawSegment> =
        serde_json::from_str(json).context("segments must be a JSON array of objects")?;
    normalize_segments(raw)
}

/// Validate every record, failing on the first invalid one
pub fn normalize_segments(raw: Vec<RawSegment>) -> Result<Vec<Segment>> {
    raw.into_iter()
        .enumerate()
        .map(|(index, record)| {
            Segment::try_from(record).with_context(|| format!("invalid segment at index {}", index))
        })
        .collect()
}

pub(crate) fn validate_span(id: &str, start_sec: f64, end_sec: f64) -> Result<()> {
    if !start_sec.is_finite() || !end_sec.is_finite() {
        anyhow::bail!(
            "{}: start_sec and end_sec must be finite (got {} .. {})",
            id,
            start_sec,
            end_sec
        );
    }
    if end_sec > MAX_TIME_SEC {
        anyhow::bail!(
            "{}: end_sec ({}) is past the {}s limit",
            id,
            end_sec,
            MAX_TIME_SEC
        );
    }
    if start_sec >= end_sec {
        anyhow::bail!(
            "{}: start_sec ({}) must be less than end_sec ({})",
            id,
            start_sec,
            end_sec
        );
    }
    Ok(())
}

/// Numeric risk, numeric strings, and booleans are accepted; anything else is 0.0
fn coerce_risk(value: Option<&Value>) -> f64 {
    let risk = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        Some(Value::Bool(b)) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    };
    match risk {
        Some(r) if !r.is_nan() => r,
        _ => {
            if value.is_some_and(|v| !v.is_null()) {
                log::warn!("non-numeric risk {:?} coerced to 0.0", value);
            }
            0.0
        }
    }
}

fn id_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        _ => None,
    }
}

/// Accept opaque ids given either as strings or integers
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_from_value(&value).ok_or_else(|| {
        serde::de::Error::custom(format!("expected string or integer id, got {}", value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed_segments() {
        let json = r#"[
            {"segment_id": "w0", "start_sec": 0, "end_sec": 10, "risk": 4.2,
             "signals_triggered": ["tmb", "concept_spike", "pace"]},
            {"segment_id": 7, "start_sec": 10, "end_sec": 20, "risk": 0}
        ]"#;
        let segments = parse_segments(json).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].segment_id, "w0");
        assert_eq!(
            segments[0].signals_triggered,
            vec![
                Signal::Tmb,
                Signal::ConceptSpike,
                Signal::Other("pace".to_string())
            ]
        );
        assert_eq!(segments[1].segment_id, "7");
        assert!(segments[1].signals_triggered.is_empty());
    }

    #[test]
    fn test_missing_or_garbage_risk_is_zero() {
        let json = r#"[
            {"segment_id": "a", "start_sec": 0, "end_sec": 1},
            {"segment_id": "b", "start_sec": 1, "end_sec": 2, "risk": "high"},
            {"segment_id": "c", "start_sec": 2, "end_sec": 3, "risk": null},
            {"segment_id": "d", "start_sec": 3, "end_sec": 4, "risk": "3.5"},
            {"segment_id": "e", "start_sec": 4, "end_sec": 5, "risk": [1, 2]}
        ]"#;
        let risks: Vec<f64> = parse_segments(json)
            .unwrap()
            .iter()
            .map(|s| s.risk)
            .collect();
        assert_eq!(risks, vec![0.0, 0.0, 0.0, 3.5, 0.0]);
    }

    #[test]
    fn test_missing_required_field_fails_fast() {
        let json = r#"[
            {"segment_id": "a", "start_sec": 0, "end_sec": 1},
            {"segment_id": "b", "end_sec": 2}
        ]"#;
        let err = parse_segments(json).unwrap_err();
        let chain = format!("{:#}", err);
        assert!(chain.contains("index 1"), "{}", chain);
        assert!(chain.contains("start_sec"), "{}", chain);
    }

    #[test]
    fn test_missing_id_fails() {
        let err = parse_segments(r#"[{"start_sec": 0, "end_sec": 1}]"#).unwrap_err();
        assert!(format!("{:#}", err).contains("segment_id"));
    }

    #[test]
    fn test_inverted_span_fails() {
        assert!(Segment::new("x", 5.0, 5.0, 1.0, vec![]).is_err());
        assert!(Segment::new("x", 6.0, 5.0, 1.0, vec![]).is_err());
        assert!(Segment::new("x", 0.0, f64::INFINITY, 1.0, vec![]).is_err());
    }

    #[test]
    fn test_out_of_range_span_fails() {
        let err = Segment::new("far", 0.0, 1e300, 5.0, vec![]).unwrap_err();
        assert!(err.to_string().contains("limit"), "{}", err);
        assert!(Segment::new("edge", 0.0, MAX_TIME_SEC, 5.0, vec![]).is_ok());

        let json = r#"[{"segment_id": "a", "start_sec": 0, "end_sec": 1e300}]"#;
        let chain = format!("{:#}", parse_segments(json).unwrap_err());
        assert!(chain.contains("index 0"), "{}", chain);
    }

    #[test]
    fn test_non_array_input_fails() {
        assert!(parse_segments(r#"{"segment_id": "a"}"#).is_err());
    }

    #[test]
    fn test_contains_is_closed_interval() {
        let seg = Segment::new("s", 2.0, 4.0, 1.0, vec![]).unwrap();
        assert!(seg.contains(2.0));
        assert!(seg.contains(4.0));
        assert!(!seg.contains(4.01));
    }
}
