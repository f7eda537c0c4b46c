//! The `extract_health_data` callable and its parameter schema.
//!
//! Single source of truth for the extraction contract: the JSON Schema
//! declared to the model here and the Rust types in [`crate::record`] must
//! agree in lockstep — same field names, same required lists, same tag
//! literals. Tests at the bottom hold the two sides together.

use serde_json::{json, Value};

use crate::ollama::ToolDefinition;

/// Name of the one callable declared to the model.
pub const EXTRACT_TOOL_NAME: &str = "extract_health_data";

/// Fixed system instruction for extraction. The model is told to answer
/// only by invoking the callable; that is instruction, not structure, so
/// the client still checks for the call.
pub const EXTRACTION_SYSTEM_INSTRUCTION: &str = "You are an expert healthcare data extraction engine. \
Your task is to extract all relevant health information from the patient's narrative. \
Extract structured health data including meals, symptoms, stress levels, stool information, \
medications, sleep quality, and period status from the user's input. \
If unsure, return 'Unsure' or 'NOT GIVEN' as specified in the schema, instead of guessing. \
All fields are required, but uncertainty should be explicitly stated. \
Once extracted, you MUST call the 'extract_health_data' function with the structured data. \
Do not respond with text. Only call the function.";

/// One-line description attached to the tool declaration.
const EXTRACT_TOOL_DESCRIPTION: &str = "Extract structured health data including meals, symptoms, \
stress levels, stool information, medications, sleep quality, and period status from the user's \
input. If unsure, return 'Unsure' instead of guessing. All fields are required, but uncertainty \
should be explicitly stated.";

/// The declared callable, ready to attach to a chat request.
pub fn extraction_tool() -> ToolDefinition {
    ToolDefinition::function(
        EXTRACT_TOOL_NAME,
        EXTRACT_TOOL_DESCRIPTION,
        parameter_schema(),
    )
}

/// JSON Schema for the callable's arguments: exactly the record shape,
/// with the sentinel policy spelled out per field so the model never
/// omits or fabricates a value it could not determine.
pub fn parameter_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "meals": {
                "type": "array",
                "description": "List of meals mentioned.",
                "items": {
                    "type": "object",
                    "properties": {
                        "log_type": { "type": "string", "description": "Always 'meal'." },
                        "title": { "type": "string", "description": "Meal type (e.g., 'breakfast', 'lunch'). If not given, return 'NOT GIVEN' and DO NOT GUESS." },
                        "ingredients": {
                            "type": "array",
                            "items": { "type": "string" },
                            "description": "List of estimated ingredients in the meal. If NOT GIVEN, return ['NOT GIVEN']."
                        },
                        "pertains_to": { "type": "string", "description": "Estimated time of day meal was consumed. If NOT GIVEN, return 'NOT GIVEN'." }
                    },
                    "required": ["log_type", "title", "ingredients", "pertains_to"]
                }
            },
            "symptoms": {
                "type": "array",
                "description": "List of symptoms mentioned.",
                "items": {
                    "type": "object",
                    "properties": {
                        "log_type": { "type": "string", "description": "Always 'symptom'." },
                        "symptom_type": { "type": "string", "description": "Type of symptom (e.g., 'Bloating', 'Headache'). If NOT GIVEN, return 'NOT GIVEN'." },
                        "score": { "type": "string", "description": "Estimated severity description (e.g., 'mild', 'moderate', 'severe'). If NOT GIVEN, return 'NOT GIVEN'." },
                        "pertains_to": { "type": "string", "description": "Estimated time of day symptom was experienced. If NOT GIVEN, return 'NOT GIVEN'." }
                    },
                    "required": ["log_type", "symptom_type", "score", "pertains_to"]
                }
            },
            "stress_levels": {
                "type": "array",
                "description": "List of stress level logs.",
                "items": {
                    "type": "object",
                    "properties": {
                        "log_type": { "type": "string", "description": "Always 'stress_level'." },
                        "score": { "type": "string", "description": "Stress severity description (e.g., 'low', 'moderate', 'high'). If NOT GIVEN, return 'NOT GIVEN'." },
                        "pertains_to": { "type": "string", "description": "Estimated time of day stress was experienced. If NOT GIVEN, return 'NOT GIVEN'." }
                    },
                    "required": ["log_type", "score", "pertains_to"]
                }
            },
            "stool_data": {
                "type": "array",
                "description": "List of stool-related logs.",
                "items": {
                    "type": "object",
                    "properties": {
                        "log_type": { "type": "string", "description": "Always 'poop'." },
                        "score": { "type": "string", "description": "Description of stool consistency (e.g., 'hard', 'normal', 'loose'). If NOT GIVEN, return 'NOT GIVEN'." },
                        "pertains_to": { "type": "string", "description": "Estimated time of day bowel movement was experienced. If NOT GIVEN, return 'NOT GIVEN'." }
                    },
                    "required": ["log_type", "score", "pertains_to"]
                }
            },
            "medications": {
                "type": "array",
                "description": "List of medications taken.",
                "items": {
                    "type": "object",
                    "properties": {
                        "log_type": { "type": "string", "description": "Always 'medication'." },
                        "name": { "type": "string", "description": "Medication name. If NOT GIVEN, return 'NOT GIVEN'." },
                        "pertains_to": { "type": "string", "description": "Estimated time of day medication was taken. If NOT GIVEN, return 'NOT GIVEN'." }
                    },
                    "required": ["log_type", "name", "pertains_to"]
                }
            },
            "sleep": {
                "type": "object",
                "properties": {
                    "log_type": { "type": "string", "description": "Always 'sleep'." },
                    "score": { "type": "integer", "description": "Sleep quality rating (1-10). If NOT GIVEN, return null." },
                    "pertains_to": { "type": "string", "description": "Always 'last night'." }
                },
                "required": ["log_type", "score", "pertains_to"]
            },
            "period_status": {
                "type": "object",
                "properties": {
                    "log_type": { "type": "string", "description": "Always 'period_status'." },
                    "status": { "type": "boolean", "description": "Indicates whether the patient mentioned being on their period." }
                },
                "required": ["log_type", "status"]
            }
        },
        "required": ["meals", "symptoms", "stress_levels", "stool_data", "medications", "sleep", "period_status"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{HealthRecord, LogKind, NOT_GIVEN};

    fn schema_properties() -> serde_json::Map<String, Value> {
        parameter_schema()["properties"]
            .as_object()
            .expect("schema properties")
            .clone()
    }

    // ── Schema / record lockstep ──

    #[test]
    fn schema_fields_match_record_declaration_order() {
        let schema_keys: Vec<String> = schema_properties().keys().cloned().collect();
        let record_keys: Vec<String> = serde_json::to_value(HealthRecord::default())
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(schema_keys, record_keys);
    }

    #[test]
    fn every_top_level_field_is_required() {
        let schema = parameter_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        let keys: Vec<String> = schema_properties().keys().cloned().collect();
        assert_eq!(required, keys);
    }

    #[test]
    fn collection_items_require_every_sub_field() {
        let properties = schema_properties();
        for key in ["meals", "symptoms", "stress_levels", "stool_data", "medications"] {
            let items = &properties[key]["items"];
            let declared: Vec<&str> = items["properties"]
                .as_object()
                .unwrap()
                .keys()
                .map(String::as_str)
                .collect();
            let required: Vec<&str> = items["required"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap())
                .collect();
            assert_eq!(declared, required, "field {key}");
        }
    }

    #[test]
    fn tag_guidance_matches_wire_tags() {
        let properties = schema_properties();
        let cases = [
            ("meals", LogKind::Meal),
            ("symptoms", LogKind::Symptom),
            ("stress_levels", LogKind::StressLevel),
            ("stool_data", LogKind::Poop),
            ("medications", LogKind::Medication),
        ];
        for (key, kind) in cases {
            let guidance = properties[key]["items"]["properties"]["log_type"]["description"]
                .as_str()
                .unwrap();
            assert!(
                guidance.contains(&format!("'{}'", kind.as_str())),
                "{key} tag guidance: {guidance}"
            );
        }
        assert!(properties["sleep"]["properties"]["log_type"]["description"]
            .as_str()
            .unwrap()
            .contains("'sleep'"));
        assert!(properties["period_status"]["properties"]["log_type"]["description"]
            .as_str()
            .unwrap()
            .contains("'period_status'"));
    }

    #[test]
    fn every_string_field_carries_sentinel_guidance() {
        let properties = schema_properties();
        // (field, sub-field) pairs the model might be unsure about
        let cases = [
            ("meals", "title"),
            ("meals", "pertains_to"),
            ("symptoms", "symptom_type"),
            ("symptoms", "score"),
            ("symptoms", "pertains_to"),
            ("stress_levels", "score"),
            ("stress_levels", "pertains_to"),
            ("stool_data", "score"),
            ("stool_data", "pertains_to"),
            ("medications", "name"),
            ("medications", "pertains_to"),
        ];
        for (key, sub) in cases {
            let guidance = properties[key]["items"]["properties"][sub]["description"]
                .as_str()
                .unwrap();
            assert!(guidance.contains(NOT_GIVEN), "{key}.{sub}: {guidance}");
        }
        let ingredients = properties["meals"]["items"]["properties"]["ingredients"]
            ["description"]
            .as_str()
            .unwrap();
        assert!(ingredients.contains("['NOT GIVEN']"));
    }

    #[test]
    fn sleep_guidance_states_null_and_range() {
        let score = schema_properties()["sleep"]["properties"]["score"].clone();
        assert_eq!(score["type"], "integer");
        let guidance = score["description"].as_str().unwrap();
        assert!(guidance.contains("1-10"));
        assert!(guidance.contains("null"));
    }

    // ── Instruction / declaration ──

    #[test]
    fn system_instruction_names_the_callable_and_forbids_text() {
        assert!(EXTRACTION_SYSTEM_INSTRUCTION.contains(EXTRACT_TOOL_NAME));
        assert!(EXTRACTION_SYSTEM_INSTRUCTION.contains("Do not respond with text"));
        assert!(EXTRACTION_SYSTEM_INSTRUCTION.contains("instead of guessing"));
    }

    #[test]
    fn tool_declaration_shape() {
        let tool = extraction_tool();
        let value = serde_json::to_value(&tool).unwrap();
        assert_eq!(value["type"], "function");
        assert_eq!(value["function"]["name"], EXTRACT_TOOL_NAME);
        assert_eq!(
            value["function"]["parameters"]["type"],
            "object"
        );
    }
}
