//! The structured health record and its validating boundary parse.
//!
//! The model's tool-call arguments arrive as untyped JSON. Nothing here
//! trusts that payload: every element is rebuilt through a schema-checked
//! constructor that sentinel-fills missing or malformed sub-fields and
//! records one warning per repair. A payload that is not a JSON object at
//! all is rejected outright. Insertion order within each collection is
//! preserved end-to-end; it is the narrative's chronological proxy.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Literal placeholder for "the model could not determine this field".
/// Distinct from absence: unknown string fields carry this value, never
/// an empty string, never omission.
pub const NOT_GIVEN: &str = "NOT GIVEN";

/// Fixed `pertains_to` value for sleep.
pub const LAST_NIGHT: &str = "last night";

// ──────────────────────────────────────────────
// Record types
// ──────────────────────────────────────────────

/// Category discriminant carried by every record element (`log_type`).
///
/// Part of the wire contract with the model. The renderers dispatch by
/// field name, never by this tag; position in the record is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Meal,
    Symptom,
    StressLevel,
    Poop,
    Medication,
    Sleep,
    PeriodStatus,
}

impl LogKind {
    /// The wire form of the tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Meal => "meal",
            Self::Symptom => "symptom",
            Self::StressLevel => "stress_level",
            Self::Poop => "poop",
            Self::Medication => "medication",
            Self::Sleep => "sleep",
            Self::PeriodStatus => "period_status",
        }
    }
}

/// A meal the patient described.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meal {
    pub log_type: LogKind,
    pub title: String,
    /// Never empty; `["NOT GIVEN"]` when the narrative gave no detail.
    pub ingredients: Vec<String>,
    pub pertains_to: String,
}

/// A symptom with a severity description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symptom {
    pub log_type: LogKind,
    pub symptom_type: String,
    pub score: String,
    pub pertains_to: String,
}

/// A stress-level observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressLevel {
    pub log_type: LogKind,
    pub score: String,
    pub pertains_to: String,
}

/// A bowel-movement note.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoolEntry {
    pub log_type: LogKind,
    pub score: String,
    pub pertains_to: String,
}

/// A medication the patient took.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub log_type: LogKind,
    pub name: String,
    pub pertains_to: String,
}

/// Last night's sleep quality. `score` is 1–10 or None when not rated;
/// None is the absent-sentinel, serialized as an explicit null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sleep {
    pub log_type: LogKind,
    pub score: Option<u8>,
    pub pertains_to: String,
}

impl Default for Sleep {
    fn default() -> Self {
        Self {
            log_type: LogKind::Sleep,
            score: None,
            pertains_to: LAST_NIGHT.to_string(),
        }
    }
}

/// Menstrual status. Always present; the model infers `false` when the
/// narrative says nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodStatus {
    pub log_type: LogKind,
    pub status: bool,
}

impl Default for PeriodStatus {
    fn default() -> Self {
        Self {
            log_type: LogKind::PeriodStatus,
            status: false,
        }
    }
}

/// The unit of extraction output. Immutable once produced; discarded when
/// a new extraction begins or the caller resets.
///
/// Field declaration order here is the canonical key order for the
/// raw-data view, so it must stay in lockstep with the tool schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthRecord {
    pub meals: Vec<Meal>,
    pub symptoms: Vec<Symptom>,
    pub stress_levels: Vec<StressLevel>,
    pub stool_data: Vec<StoolEntry>,
    pub medications: Vec<Medication>,
    pub sleep: Sleep,
    pub period_status: PeriodStatus,
}

// ──────────────────────────────────────────────
// Validating boundary parse
// ──────────────────────────────────────────────

/// Outcome of the boundary parse: a complete record plus one
/// human-readable warning per repaired field.
#[derive(Debug, Clone)]
pub struct ParsedRecord {
    pub record: HealthRecord,
    pub warnings: Vec<String>,
}

/// The tool arguments were not a JSON object (directly or JSON-encoded in
/// a string), so no record can be built from them.
#[derive(Debug, thiserror::Error)]
#[error("tool arguments were not a JSON object")]
pub struct MalformedArguments;

impl HealthRecord {
    /// Rebuild a typed record from raw tool-call arguments.
    ///
    /// Field-level problems are repaired (sentinel-filled or coerced) with
    /// a warning each; collection elements that are not objects are
    /// dropped with a warning. Only a payload that fails to be an object
    /// at all is an error.
    pub fn from_tool_args(args: &Value) -> Result<ParsedRecord, MalformedArguments> {
        let mut warnings = Vec::new();

        // Some models emit the arguments object JSON-encoded in a string;
        // tolerate that, but nothing looser.
        let decoded;
        let object = match args {
            Value::Object(map) => map,
            Value::String(raw) => {
                decoded = serde_json::from_str::<Value>(raw)
                    .map_err(|_| MalformedArguments)?;
                match &decoded {
                    Value::Object(map) => {
                        warnings.push(
                            "tool arguments arrived JSON-encoded in a string".to_string(),
                        );
                        map
                    }
                    _ => return Err(MalformedArguments),
                }
            }
            _ => return Err(MalformedArguments),
        };

        let meals = parse_collection(object, "meals", &mut warnings, Meal::from_value);
        let symptoms =
            parse_collection(object, "symptoms", &mut warnings, Symptom::from_value);
        let stress_levels = parse_collection(
            object,
            "stress_levels",
            &mut warnings,
            StressLevel::from_value,
        );
        let stool_data =
            parse_collection(object, "stool_data", &mut warnings, StoolEntry::from_value);
        let medications = parse_collection(
            object,
            "medications",
            &mut warnings,
            Medication::from_value,
        );

        let sleep = parse_singleton(object, "sleep", &mut warnings, Sleep::from_value);
        let period_status = parse_singleton(
            object,
            "period_status",
            &mut warnings,
            PeriodStatus::from_value,
        );

        Ok(ParsedRecord {
            record: HealthRecord {
                meals,
                symptoms,
                stress_levels,
                stool_data,
                medications,
                sleep,
                period_status,
            },
            warnings,
        })
    }
}

/// Parse one array field; missing or mistyped arrays become empty, and
/// non-object elements are dropped, each with a warning.
fn parse_collection<T>(
    object: &serde_json::Map<String, Value>,
    key: &str,
    warnings: &mut Vec<String>,
    from_value: fn(&Value, &str, &mut Vec<String>) -> T,
) -> Vec<T> {
    let items: &[Value] = match object.get(key) {
        Some(Value::Array(items)) => items,
        Some(_) => {
            warnings.push(format!("'{key}' was not an array; treated as empty"));
            &[]
        }
        None => {
            warnings.push(format!("'{key}' was missing from the extraction; treated as empty"));
            &[]
        }
    };

    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let context = format!("{key}[{index}]");
            if item.is_object() {
                Some(from_value(item, &context, warnings))
            } else {
                warnings.push(format!("{context} was not an object; dropped"));
                None
            }
        })
        .collect()
}

/// Parse one required single-object field; anything unusable becomes the
/// category's default with a warning.
fn parse_singleton<T: Default>(
    object: &serde_json::Map<String, Value>,
    key: &str,
    warnings: &mut Vec<String>,
    from_value: fn(&Value, &str, &mut Vec<String>) -> T,
) -> T {
    match object.get(key) {
        Some(value) if value.is_object() => from_value(value, key, warnings),
        Some(_) => {
            warnings.push(format!("'{key}' was not an object; treated as not recorded"));
            T::default()
        }
        None => {
            warnings.push(format!(
                "'{key}' was missing from the extraction; treated as not recorded"
            ));
            T::default()
        }
    }
}

impl Meal {
    fn from_value(value: &Value, context: &str, warnings: &mut Vec<String>) -> Self {
        Self {
            log_type: tag_field(value, LogKind::Meal, context, warnings),
            title: string_field(value, "title", context, warnings),
            ingredients: ingredients_field(value, context, warnings),
            pertains_to: string_field(value, "pertains_to", context, warnings),
        }
    }
}

impl Symptom {
    fn from_value(value: &Value, context: &str, warnings: &mut Vec<String>) -> Self {
        Self {
            log_type: tag_field(value, LogKind::Symptom, context, warnings),
            symptom_type: string_field(value, "symptom_type", context, warnings),
            score: string_field(value, "score", context, warnings),
            pertains_to: string_field(value, "pertains_to", context, warnings),
        }
    }
}

impl StressLevel {
    fn from_value(value: &Value, context: &str, warnings: &mut Vec<String>) -> Self {
        Self {
            log_type: tag_field(value, LogKind::StressLevel, context, warnings),
            score: string_field(value, "score", context, warnings),
            pertains_to: string_field(value, "pertains_to", context, warnings),
        }
    }
}

impl StoolEntry {
    fn from_value(value: &Value, context: &str, warnings: &mut Vec<String>) -> Self {
        Self {
            log_type: tag_field(value, LogKind::Poop, context, warnings),
            score: string_field(value, "score", context, warnings),
            pertains_to: string_field(value, "pertains_to", context, warnings),
        }
    }
}

impl Medication {
    fn from_value(value: &Value, context: &str, warnings: &mut Vec<String>) -> Self {
        Self {
            log_type: tag_field(value, LogKind::Medication, context, warnings),
            name: string_field(value, "name", context, warnings),
            pertains_to: string_field(value, "pertains_to", context, warnings),
        }
    }
}

impl Sleep {
    fn from_value(value: &Value, context: &str, warnings: &mut Vec<String>) -> Self {
        let score = match value.get("score") {
            // null is the legitimate absent-sentinel, not a repair
            Some(Value::Null) => None,
            Some(Value::Number(n)) => match n.as_i64() {
                Some(raw) if (1..=10).contains(&raw) => Some(raw as u8),
                _ => {
                    warnings.push(format!(
                        "{context}.score {n} outside 1-10; treated as not rated"
                    ));
                    None
                }
            },
            Some(Value::String(raw)) => match raw.trim().parse::<i64>() {
                Ok(parsed) if (1..=10).contains(&parsed) => {
                    warnings.push(format!(
                        "{context}.score arrived as a string; coerced to {parsed}"
                    ));
                    Some(parsed as u8)
                }
                _ => {
                    warnings.push(format!(
                        "{context}.score '{raw}' is not a 1-10 rating; treated as not rated"
                    ));
                    None
                }
            },
            Some(_) => {
                warnings.push(format!(
                    "{context}.score had an unexpected type; treated as not rated"
                ));
                None
            }
            None => {
                warnings.push(format!(
                    "{context}.score was missing; treated as not rated"
                ));
                None
            }
        };

        let pertains_to = match value.get("pertains_to") {
            Some(Value::String(s)) if s == LAST_NIGHT => s.clone(),
            Some(Value::String(s)) => {
                warnings.push(format!(
                    "{context}.pertains_to '{s}' normalized to '{LAST_NIGHT}'"
                ));
                LAST_NIGHT.to_string()
            }
            _ => {
                warnings.push(format!(
                    "{context}.pertains_to was missing; filled with '{LAST_NIGHT}'"
                ));
                LAST_NIGHT.to_string()
            }
        };

        Self {
            log_type: tag_field(value, LogKind::Sleep, context, warnings),
            score,
            pertains_to,
        }
    }
}

impl PeriodStatus {
    fn from_value(value: &Value, context: &str, warnings: &mut Vec<String>) -> Self {
        let status = match value.get("status") {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(raw)) if raw.trim().eq_ignore_ascii_case("true") => {
                warnings.push(format!(
                    "{context}.status arrived as a string; coerced to true"
                ));
                true
            }
            Some(Value::String(raw)) if raw.trim().eq_ignore_ascii_case("false") => {
                warnings.push(format!(
                    "{context}.status arrived as a string; coerced to false"
                ));
                false
            }
            Some(_) => {
                warnings.push(format!(
                    "{context}.status had an unexpected type; defaulted to false"
                ));
                false
            }
            None => {
                warnings.push(format!(
                    "{context}.status was missing; defaulted to false"
                ));
                false
            }
        };

        Self {
            log_type: tag_field(value, LogKind::PeriodStatus, context, warnings),
            status,
        }
    }
}

/// Read a required string field; empty, missing, or mistyped values are
/// repaired. Numbers and booleans are coerced to their text form rather
/// than discarded.
fn string_field(
    element: &Value,
    key: &str,
    context: &str,
    warnings: &mut Vec<String>,
) -> String {
    match element.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.clone(),
        Some(Value::String(_)) => {
            warnings.push(format!(
                "{context}.{key} was empty; filled with '{NOT_GIVEN}'"
            ));
            NOT_GIVEN.to_string()
        }
        Some(Value::Number(n)) => {
            warnings.push(format!(
                "{context}.{key} arrived as a number; coerced to text"
            ));
            n.to_string()
        }
        Some(Value::Bool(b)) => {
            warnings.push(format!(
                "{context}.{key} arrived as a boolean; coerced to text"
            ));
            b.to_string()
        }
        Some(_) => {
            warnings.push(format!(
                "{context}.{key} had an unexpected type; filled with '{NOT_GIVEN}'"
            ));
            NOT_GIVEN.to_string()
        }
        None => {
            warnings.push(format!(
                "{context}.{key} was missing; filled with '{NOT_GIVEN}'"
            ));
            NOT_GIVEN.to_string()
        }
    }
}

/// Read the meal ingredients list. Guarantees a non-empty result:
/// `["NOT GIVEN"]` when nothing usable was extracted.
fn ingredients_field(
    element: &Value,
    context: &str,
    warnings: &mut Vec<String>,
) -> Vec<String> {
    let mut out = Vec::new();
    match element.get("ingredients") {
        Some(Value::Array(items)) => {
            for (index, item) in items.iter().enumerate() {
                match item {
                    Value::String(s) if !s.trim().is_empty() => out.push(s.clone()),
                    Value::Number(n) => {
                        warnings.push(format!(
                            "{context}.ingredients[{index}] arrived as a number; coerced to text"
                        ));
                        out.push(n.to_string());
                    }
                    _ => {
                        warnings.push(format!(
                            "{context}.ingredients[{index}] was not usable text; dropped"
                        ));
                    }
                }
            }
            if out.is_empty() {
                warnings.push(format!(
                    "{context}.ingredients had no usable entries; filled with ['{NOT_GIVEN}']"
                ));
                out.push(NOT_GIVEN.to_string());
            }
        }
        Some(Value::String(s)) if !s.trim().is_empty() => {
            // A lone string instead of a list is a common model slip.
            warnings.push(format!(
                "{context}.ingredients arrived as a single string; wrapped in a list"
            ));
            out.push(s.clone());
        }
        _ => {
            warnings.push(format!(
                "{context}.ingredients was missing; filled with ['{NOT_GIVEN}']"
            ));
            out.push(NOT_GIVEN.to_string());
        }
    }
    out
}

/// Read and normalize the `log_type` tag. Position in the record is
/// authoritative, so a wrong or missing tag is corrected, not fatal.
fn tag_field(
    element: &Value,
    expected: LogKind,
    context: &str,
    warnings: &mut Vec<String>,
) -> LogKind {
    match element.get("log_type") {
        Some(Value::String(s)) if s == expected.as_str() => {}
        Some(Value::String(s)) => {
            warnings.push(format!(
                "{context}.log_type '{s}' normalized to '{}'",
                expected.as_str()
            ));
        }
        _ => {
            warnings.push(format!(
                "{context}.log_type was missing; set to '{}'",
                expected.as_str()
            ));
        }
    }
    expected
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
