//! Evidence data model.
//!
//! Mini-apps hand in loosely shaped [`EvidenceEventInput`] payloads; the store
//! only ever persists the validated, fully normalized [`EvidenceEvent`].

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Maximum number of skill targets kept per event.
pub const MAX_TARGETS: usize = 8;

/// Confidence assumed when the reporter gives none.
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Intervention intensity tier.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Tier {
    /// Targeted small-group support.
    #[default]
    T2,
    /// Intensive, individualized support.
    T3,
}

impl Tier {
    /// Lenient parse used for event payloads: only `T3` (any case) selects
    /// tier 3, everything else is tier 2.
    pub fn from_label(label: &str) -> Self {
        if label.trim().eq_ignore_ascii_case("t3") {
            Tier::T3
        } else {
            Tier::T2
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::T2 => "T2",
            Tier::T3 => "T3",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "T2" => Ok(Tier::T2),
            "T3" => Ok(Tier::T3),
            other => Err(format!("unknown tier: {other}")),
        }
    }
}

/// The instructional mini-app that produced an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ActivityModule {
    #[default]
    WordQuest,
    ReadingLab,
    SentenceSurgery,
    WritingStudio,
}

impl ActivityModule {
    /// Map a free-form module name onto the known set. Case and
    /// non-letter characters are ignored; unknown names become `WordQuest`.
    pub fn normalize(raw: &str) -> Self {
        let key: String = raw
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match key.as_str() {
            "readinglab" => ActivityModule::ReadingLab,
            "sentencesurgery" => ActivityModule::SentenceSurgery,
            "writingstudio" => ActivityModule::WritingStudio,
            _ => ActivityModule::WordQuest,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityModule::WordQuest => "wordquest",
            ActivityModule::ReadingLab => "readinglab",
            ActivityModule::SentenceSurgery => "sentencesurgery",
            ActivityModule::WritingStudio => "writingstudio",
        }
    }
}

impl fmt::Display for ActivityModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for ActivityModule {
    fn from(raw: String) -> Self {
        ActivityModule::normalize(&raw)
    }
}

impl From<ActivityModule> for String {
    fn from(module: ActivityModule) -> Self {
        module.as_str().to_string()
    }
}

/// Measured outcome of an activity. Every field is optional and absent
/// fields stay absent: a missing accuracy is not a zero accuracy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wcpm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempts: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_pattern: Option<Vec<String>>,
}

impl EvidenceResult {
    /// Build a result from an untyped JSON payload, coercing each field
    /// independently. Anything that is not an object yields an empty result.
    pub fn from_value(value: &Value) -> Self {
        let Value::Object(map) = value else {
            return Self::default();
        };
        let number = |key: &str| map.get(key).and_then(coerce_number);

        let error_pattern = map.get("errorPattern").and_then(|v| match v {
            Value::Array(items) => {
                let patterns: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                (!patterns.is_empty()).then_some(patterns)
            }
            _ => None,
        });

        Self {
            accuracy: number("accuracy").map(clamp_unit),
            latency_ms: number("latencyMs").map(|v| v.max(0.0)),
            wcpm: number("wcpm").map(|v| v.max(0.0)),
            attempts: number("attempts").map(|v| v.max(0.0)),
            error_rate: number("errorRate").map(clamp_unit),
            error_pattern,
        }
    }
}

/// A validated evidence event as stored in a skill window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceEvent {
    pub student_id: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    #[serde(default)]
    pub module: ActivityModule,
    #[serde(default)]
    pub activity_id: String,
    pub targets: Vec<String>,
    #[serde(default)]
    pub tier: Tier,
    #[serde(default)]
    pub dose_min: f64,
    #[serde(default)]
    pub result: EvidenceResult,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub notes: String,
}

fn default_confidence() -> f64 {
    DEFAULT_CONFIDENCE
}

impl EvidenceEvent {
    /// Accuracy eligible for mastery estimation, if one was reported.
    pub fn accuracy(&self) -> Option<f64> {
        self.result
            .accuracy
            .filter(|v| v.is_finite())
            .map(clamp_unit)
    }

    /// Reporting confidence, repaired if a stored document carried junk.
    pub fn confidence(&self) -> f64 {
        if self.confidence.is_finite() {
            clamp_unit(self.confidence)
        } else {
            DEFAULT_CONFIDENCE
        }
    }
}

/// Raw evidence payload as reported by a mini-app.
///
/// Every field is kept as untyped JSON so that a malformed value is coerced
/// to its default (or rejects the event) instead of failing deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvidenceEventInput {
    #[serde(default)]
    pub student_id: Option<Value>,
    /// Milliseconds since the epoch, or an ISO-8601 string.
    #[serde(default)]
    pub timestamp: Option<Value>,
    #[serde(default)]
    pub module: Option<Value>,
    #[serde(default)]
    pub activity_id: Option<Value>,
    #[serde(default)]
    pub targets: Option<Value>,
    #[serde(default)]
    pub tier: Option<Value>,
    #[serde(default)]
    pub dose_min: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub confidence: Option<Value>,
    #[serde(default)]
    pub notes: Option<Value>,
}

impl EvidenceEventInput {
    pub fn new<I, S>(student_id: impl Into<String>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let targets: Vec<Value> = targets
            .into_iter()
            .map(|t| Value::String(t.into()))
            .collect();
        Self {
            student_id: Some(Value::String(student_id.into())),
            targets: Some(Value::Array(targets)),
            ..Default::default()
        }
    }

    pub fn at_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp = Some(Value::from(timestamp_ms));
        self
    }

    pub fn module(mut self, module: &str) -> Self {
        self.module = Some(Value::from(module));
        self
    }

    pub fn activity(mut self, activity_id: &str) -> Self {
        self.activity_id = Some(Value::from(activity_id));
        self
    }

    pub fn tier(mut self, tier: Tier) -> Self {
        self.tier = Some(Value::from(tier.as_str()));
        self
    }

    pub fn dose_min(mut self, minutes: f64) -> Self {
        self.dose_min = Some(Value::from(minutes));
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(Value::from(confidence));
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.notes = Some(Value::from(notes));
        self
    }

    /// Set `result.accuracy`, keeping any other result fields.
    pub fn accuracy(self, accuracy: f64) -> Self {
        self.result_field("accuracy", Value::from(accuracy))
    }

    /// Set an arbitrary `result` field (camelCase key).
    pub fn result_field(mut self, key: &str, value: Value) -> Self {
        let mut map = match self.result.take() {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        map.insert(key.to_string(), value);
        self.result = Some(Value::Object(map));
        self
    }

    /// Validate and normalize into a storable event.
    ///
    /// Returns `None` when the student id is blank or not a string, or when
    /// no usable skill target remains. `ingested_at_ms` stands in for a
    /// missing or unparseable timestamp. Other malformed fields take their
    /// defaults.
    pub fn normalize(&self, ingested_at_ms: i64) -> Option<EvidenceEvent> {
        let student_id = text(&self.student_id).map(str::trim).unwrap_or("");
        if student_id.is_empty() {
            return None;
        }

        let targets = match &self.targets {
            Some(Value::Array(items)) => normalize_targets(items),
            _ => return None,
        };
        if targets.is_empty() {
            return None;
        }

        let timestamp = self
            .timestamp
            .as_ref()
            .and_then(parse_timestamp_ms)
            .unwrap_or(ingested_at_ms);

        let confidence = self
            .confidence
            .as_ref()
            .and_then(coerce_number)
            .map(clamp_unit)
            .unwrap_or(DEFAULT_CONFIDENCE);

        let dose_min = self
            .dose_min
            .as_ref()
            .and_then(coerce_number)
            .unwrap_or(0.0)
            .max(0.0);

        Some(EvidenceEvent {
            student_id: student_id.to_string(),
            timestamp,
            module: text(&self.module)
                .map(ActivityModule::normalize)
                .unwrap_or_default(),
            activity_id: text(&self.activity_id).unwrap_or_default().to_string(),
            targets,
            tier: text(&self.tier).map(Tier::from_label).unwrap_or_default(),
            dose_min,
            result: self
                .result
                .as_ref()
                .map(EvidenceResult::from_value)
                .unwrap_or_default(),
            confidence,
            notes: text(&self.notes).unwrap_or_default().to_string(),
        })
    }
}

fn text(value: &Option<Value>) -> Option<&str> {
    value.as_ref().and_then(Value::as_str)
}

/// String entries only, trimmed, first occurrence wins, capped.
fn normalize_targets(raw: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_string()))
        .take(MAX_TARGETS)
        .map(str::to_string)
        .collect()
}

/// Clamp into `[0, 1]`.
pub fn clamp_unit(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

/// Read a finite number from a JSON number or a numeric string.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    n.filter(|v| v.is_finite())
}

/// Parse a positive epoch-millisecond timestamp from a number or an
/// ISO-8601 / RFC 3339 string.
pub fn parse_timestamp_ms(value: &Value) -> Option<i64> {
    let ms = match value {
        Value::Number(_) => coerce_number(value).map(|v| v as i64),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(n) = s.parse::<f64>() {
                n.is_finite().then_some(n as i64)
            } else if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                Some(dt.timestamp_millis())
            } else if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                Some(naive.and_utc().timestamp_millis())
            } else {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc().timestamp_millis())
            }
        }
        _ => None,
    };
    ms.filter(|&v| v > 0)
}
