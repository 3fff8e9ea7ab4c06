//! Intensity ladder: per-tier cadence and weighting.
//!
//! Built-in defaults are always available; an externally supplied ladder
//! document is validated field by field and any rejected value falls back
//! to the default for that tier.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::Tier;

/// Version reported by the built-in ladder.
pub const BUILTIN_LADDER_VERSION: &str = "builtin";

/// Settings for one intervention tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntensityTier {
    pub label: String,
    pub sessions_per_week: f64,
    pub minutes_per_session: f64,
    pub group_size_max: u32,
    /// Days between expected evidence points.
    pub evidence_cadence_days: f64,
    /// Multiplier on ranking urgency; 1.0 is neutral.
    pub priority_weight: f64,
    /// Weekly accuracy gain considered on track.
    pub expected_growth_rate: f64,
}

impl IntensityTier {
    pub fn default_for(tier: Tier) -> Self {
        match tier {
            Tier::T2 => Self {
                label: "Tier 2 (targeted)".into(),
                sessions_per_week: 3.0,
                minutes_per_session: 20.0,
                group_size_max: 4,
                evidence_cadence_days: 14.0,
                priority_weight: 1.0,
                expected_growth_rate: 0.01,
            },
            Tier::T3 => Self {
                label: "Tier 3 (intensive)".into(),
                sessions_per_week: 5.0,
                minutes_per_session: 25.0,
                group_size_max: 2,
                evidence_cadence_days: 7.0,
                priority_weight: 1.2,
                expected_growth_rate: 0.015,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LadderTiers {
    #[serde(rename = "T2")]
    pub t2: IntensityTier,
    #[serde(rename = "T3")]
    pub t3: IntensityTier,
}

/// The full ladder consumed by the ranker and growth analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntensityLadder {
    pub version: String,
    pub tiers: LadderTiers,
}

impl Default for IntensityLadder {
    fn default() -> Self {
        Self {
            version: BUILTIN_LADDER_VERSION.to_string(),
            tiers: LadderTiers {
                t2: IntensityTier::default_for(Tier::T2),
                t3: IntensityTier::default_for(Tier::T3),
            },
        }
    }
}

/// A value in a ladder document that was ignored in favor of a default.
#[derive(Debug, Clone, PartialEq)]
pub struct LadderWarning {
    /// The tier the value belonged to, if any.
    pub tier: Option<Tier>,
    pub message: String,
}

impl IntensityLadder {
    pub fn tier(&self, tier: Tier) -> &IntensityTier {
        match tier {
            Tier::T2 => &self.tiers.t2,
            Tier::T3 => &self.tiers.t3,
        }
    }

    /// Build a ladder from a JSON string. Unparseable input yields the
    /// built-in ladder and a single warning.
    pub fn from_json_str(raw: &str) -> (Self, Vec<LadderWarning>) {
        match serde_json::from_str::<Value>(raw) {
            Ok(doc) => Self::from_document(&doc),
            Err(e) => (
                Self::default(),
                vec![LadderWarning {
                    tier: None,
                    message: format!("ladder document is not valid JSON: {e}"),
                }],
            ),
        }
    }

    /// Build a ladder from a `{ version, tiers: { T2, T3 } }` document.
    pub fn from_document(doc: &Value) -> (Self, Vec<LadderWarning>) {
        let mut warnings = Vec::new();
        let mut ladder = Self::default();

        let Some(root) = doc.as_object() else {
            warnings.push(LadderWarning {
                tier: None,
                message: "ladder document is not an object".into(),
            });
            return (ladder, warnings);
        };

        match root.get("version") {
            Some(Value::String(v)) if !v.trim().is_empty() => ladder.version = v.trim().to_string(),
            Some(Value::Number(n)) => ladder.version = n.to_string(),
            None => {}
            Some(_) => warnings.push(LadderWarning {
                tier: None,
                message: "version is not a string".into(),
            }),
        }

        let tiers = match root.get("tiers") {
            Some(Value::Object(tiers)) => tiers,
            _ => {
                warnings.push(LadderWarning {
                    tier: None,
                    message: "tiers missing or not an object".into(),
                });
                return (ladder, warnings);
            }
        };

        for tier in [Tier::T2, Tier::T3] {
            let parsed = match tiers.get(tier.as_str()) {
                Some(Value::Object(fields)) => parse_tier(tier, fields, &mut warnings),
                Some(_) => {
                    warnings.push(LadderWarning {
                        tier: Some(tier),
                        message: "tier entry is not an object".into(),
                    });
                    IntensityTier::default_for(tier)
                }
                None => IntensityTier::default_for(tier),
            };
            match tier {
                Tier::T2 => ladder.tiers.t2 = parsed,
                Tier::T3 => ladder.tiers.t3 = parsed,
            }
        }

        (ladder, warnings)
    }
}

fn parse_tier(
    tier: Tier,
    fields: &serde_json::Map<String, Value>,
    warnings: &mut Vec<LadderWarning>,
) -> IntensityTier {
    let defaults = IntensityTier::default_for(tier);
    let mut reject = |field: &str, rule: &str| {
        warnings.push(LadderWarning {
            tier: Some(tier),
            message: format!("{field} must be {rule}; using default"),
        });
    };

    let mut number = |field: &str, default: f64, allow_zero: bool| -> f64 {
        match fields.get(field) {
            None => default,
            Some(v) => match v.as_f64() {
                Some(n) if n.is_finite() && (n > 0.0 || (allow_zero && n == 0.0)) => n,
                _ => {
                    reject(
                        field,
                        if allow_zero {
                            "a non-negative number"
                        } else {
                            "a positive number"
                        },
                    );
                    default
                }
            },
        }
    };

    let sessions_per_week = number("sessionsPerWeek", defaults.sessions_per_week, false);
    let minutes_per_session = number("minutesPerSession", defaults.minutes_per_session, false);
    let evidence_cadence_days =
        number("evidenceCadenceDays", defaults.evidence_cadence_days, false);
    let priority_weight = number("priorityWeight", defaults.priority_weight, false);
    let expected_growth_rate = number("expectedGrowthRate", defaults.expected_growth_rate, true);

    let group_size_max = match fields.get("groupSizeMax") {
        None => defaults.group_size_max,
        Some(v) => match v.as_u64() {
            Some(n) if n >= 1 && n <= u32::MAX as u64 => n as u32,
            _ => {
                reject("groupSizeMax", "a positive integer");
                defaults.group_size_max
            }
        },
    };

    let label = match fields.get("label") {
        None => defaults.label,
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(_) => {
            reject("label", "a non-empty string");
            defaults.label
        }
    };

    IntensityTier {
        label,
        sessions_per_week,
        minutes_per_session,
        group_size_max,
        evidence_cadence_days,
        priority_weight,
        expected_growth_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builtin_defaults() {
        let ladder = IntensityLadder::default();
        assert_eq!(ladder.tier(Tier::T2).evidence_cadence_days, 14.0);
        assert_eq!(ladder.tier(Tier::T2).priority_weight, 1.0);
        assert_eq!(ladder.tier(Tier::T3).evidence_cadence_days, 7.0);
        assert_eq!(ladder.tier(Tier::T3).priority_weight, 1.2);
        assert_eq!(ladder.version, BUILTIN_LADDER_VERSION);
    }

    #[test]
    fn full_document_overrides() {
        let (ladder, warnings) = IntensityLadder::from_document(&json!({
            "version": "2025-fall",
            "tiers": {
                "T2": {
                    "label": "Small group",
                    "sessionsPerWeek": 4,
                    "minutesPerSession": 30,
                    "groupSizeMax": 5,
                    "evidenceCadenceDays": 10,
                    "priorityWeight": 1.1
                },
                "T3": { "evidenceCadenceDays": 5, "priorityWeight": 1.5 }
            }
        }));
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(ladder.version, "2025-fall");
        assert_eq!(ladder.tiers.t2.label, "Small group");
        assert_eq!(ladder.tiers.t2.group_size_max, 5);
        assert_eq!(ladder.tiers.t2.evidence_cadence_days, 10.0);
        assert_eq!(ladder.tiers.t3.priority_weight, 1.5);
        // Unspecified fields keep their defaults.
        assert_eq!(ladder.tiers.t3.group_size_max, 2);
        assert_eq!(ladder.tiers.t2.expected_growth_rate, 0.01);
    }

    #[test]
    fn malformed_fields_fall_back_individually() {
        let (ladder, warnings) = IntensityLadder::from_document(&json!({
            "tiers": {
                "T2": {
                    "evidenceCadenceDays": 0,
                    "priorityWeight": "heavy",
                    "groupSizeMax": 2.5,
                    "label": "",
                    "minutesPerSession": 45
                },
                "T3": []
            }
        }));
        assert_eq!(ladder.tiers.t2.evidence_cadence_days, 14.0);
        assert_eq!(ladder.tiers.t2.priority_weight, 1.0);
        assert_eq!(ladder.tiers.t2.group_size_max, 4);
        assert_eq!(ladder.tiers.t2.label, "Tier 2 (targeted)");
        assert_eq!(ladder.tiers.t2.minutes_per_session, 45.0);
        assert_eq!(ladder.tiers.t3, IntensityTier::default_for(Tier::T3));
        assert_eq!(warnings.len(), 5);
        assert!(warnings
            .iter()
            .any(|w| w.tier == Some(Tier::T3) && w.message.contains("not an object")));
    }

    #[test]
    fn non_object_documents_yield_defaults() {
        for doc in [json!(null), json!([1, 2]), json!("ladder"), json!({"tiers": 3})] {
            let (ladder, warnings) = IntensityLadder::from_document(&doc);
            assert_eq!(ladder, IntensityLadder::default());
            assert_eq!(warnings.len(), 1);
        }
    }

    #[test]
    fn invalid_json_yields_defaults() {
        let (ladder, warnings) = IntensityLadder::from_json_str("{ tiers: ");
        assert_eq!(ladder, IntensityLadder::default());
        assert!(warnings[0].message.contains("not valid JSON"));
    }

    #[test]
    fn serializes_in_document_shape() {
        let json = serde_json::to_value(IntensityLadder::default()).unwrap();
        assert_eq!(json["tiers"]["T3"]["evidenceCadenceDays"], 7.0);
        let (reparsed, warnings) = IntensityLadder::from_document(&json);
        assert!(warnings.is_empty());
        assert_eq!(reparsed.tiers, IntensityLadder::default().tiers);
    }
}
