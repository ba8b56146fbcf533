use jsonschema::JSONSchema;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde_json::{json, Map as JsonMap, Value as JsonValue};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::ai_types::ArtifactKind;
use crate::models::insights::ReportNarrative;

const MIN_PLAN_STEPS: usize = 2;
const MAX_PLAN_STEPS: usize = 8;

/// A single field-level schema breach.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

fn text_field() -> JsonValue {
    json!({ "type": "string", "minLength": 1, "pattern": "\\S" })
}

fn count_field() -> JsonValue {
    json!({ "type": "integer", "minimum": 0 })
}

/// JSON Schema for the given artifact kind.
pub fn artifact_schema(kind: ArtifactKind) -> JsonValue {
    match kind {
        ArtifactKind::WeeklySummary => json!({
            "type": "object",
            "required": kind.fields(),
            "properties": {
                "summary": text_field(),
                "tasksCompleted": count_field(),
                "focusMinutes": count_field(),
                "topStreak": text_field(),
                "recommendation": text_field()
            }
        }),
        ArtifactKind::GoalPlan => json!({
            "type": "object",
            "required": kind.fields(),
            "properties": {
                "goal": text_field(),
                "steps": {
                    "type": "array",
                    "minItems": MIN_PLAN_STEPS,
                    "maxItems": MAX_PLAN_STEPS,
                    "items": text_field()
                },
                "timeline": text_field(),
                "focus": text_field()
            }
        }),
        ArtifactKind::HabitOptimization => json!({
            "type": "object",
            "required": kind.fields(),
            "properties": {
                "habit": text_field(),
                "currentStreak": count_field(),
                "suggestion": text_field(),
                "motivation": text_field(),
                "nextStep": text_field()
            }
        }),
        // Report payloads are repaired by `normalize_report_payload`; only the
        // outer shape is checked here.
        ArtifactKind::WeeklyReport => json!({ "type": "object" }),
    }
}

type CompiledSchema = Lazy<Result<JSONSchema, String>>;

static WEEKLY_SUMMARY_SCHEMA: CompiledSchema = Lazy::new(|| compile(ArtifactKind::WeeklySummary));
static GOAL_PLAN_SCHEMA: CompiledSchema = Lazy::new(|| compile(ArtifactKind::GoalPlan));
static HABIT_OPTIMIZATION_SCHEMA: CompiledSchema = Lazy::new(|| compile(ArtifactKind::HabitOptimization));
static WEEKLY_REPORT_SCHEMA: CompiledSchema = Lazy::new(|| compile(ArtifactKind::WeeklyReport));

fn compile(kind: ArtifactKind) -> Result<JSONSchema, String> {
    JSONSchema::compile(&artifact_schema(kind)).map_err(|err| err.to_string())
}

fn compiled_schema(kind: ArtifactKind) -> AppResult<&'static JSONSchema> {
    let slot: &'static CompiledSchema = match kind {
        ArtifactKind::WeeklySummary => &WEEKLY_SUMMARY_SCHEMA,
        ArtifactKind::GoalPlan => &GOAL_PLAN_SCHEMA,
        ArtifactKind::HabitOptimization => &HABIT_OPTIMIZATION_SCHEMA,
        ArtifactKind::WeeklyReport => &WEEKLY_REPORT_SCHEMA,
    };
    Lazy::force(slot)
        .as_ref()
        .map_err(|err| AppError::other(format!("invalid schema for {}: {err}", kind.as_str())))
}

/// Collect every violation of `kind`'s schema in `value`.
pub fn check(kind: ArtifactKind, value: &JsonValue) -> AppResult<Vec<Violation>> {
    let compiled = compiled_schema(kind)?;

    let violations = match compiled.validate(value) {
        Ok(()) => Vec::new(),
        Err(errors) => errors
            .map(|err| {
                let path = err.instance_path.to_string();
                Violation {
                    path: if path.is_empty() { "root".to_string() } else { path },
                    message: err.to_string(),
                }
            })
            .collect(),
    };

    Ok(violations)
}

/// Whether `value` satisfies the schema of `kind`.
pub fn conforms(kind: ArtifactKind, value: &JsonValue) -> bool {
    matches!(check(kind, value), Ok(violations) if violations.is_empty())
}

/// Validate a parsed model reply and convert it into the artifact type.
pub fn validate_artifact<T: DeserializeOwned>(kind: ArtifactKind, mut value: JsonValue) -> AppResult<T> {
    normalize_integral_numbers(kind, &mut value);

    let violations = check(kind, &value)?;
    if !violations.is_empty() {
        warn!(
            target: "app::validation",
            kind = kind.as_str(),
            violation_count = violations.len(),
            "model output failed schema validation"
        );
        return Err(violation_error(kind, &violations));
    }

    let artifact = serde_json::from_value(value).map_err(|err| {
        AppError::validation_with_details(
            format!("{} does not match the artifact shape: {err}", kind.as_str()),
            json!({ "kind": kind.as_str(), "violations": [{ "path": "root", "message": err.to_string() }] }),
        )
    })?;

    debug!(target: "app::validation", kind = kind.as_str(), "model output validated");
    Ok(artifact)
}

pub(crate) fn violation_error(kind: ArtifactKind, violations: &[Violation]) -> AppError {
    let listed: Vec<String> = violations
        .iter()
        .map(|violation| format!("{}: {}", violation.path, violation.message))
        .collect();
    let details: Vec<JsonValue> = violations
        .iter()
        .map(|violation| json!({ "path": violation.path, "message": violation.message }))
        .collect();

    AppError::validation_with_details(
        format!("{} failed validation ({})", kind.as_str(), listed.join("; ")),
        json!({ "kind": kind.as_str(), "violations": details }),
    )
}

/// Repair a weekly-report payload instead of rejecting it.
///
/// Non-array list fields become empty, non-string list items are dropped and a
/// missing summary becomes the empty string.
pub fn normalize_report_payload(value: &JsonValue) -> ReportNarrative {
    let summary = value
        .get("summary")
        .and_then(JsonValue::as_str)
        .unwrap_or_default()
        .to_string();

    ReportNarrative {
        summary,
        strengths: string_list(value.get("strengths")),
        improvements: string_list(value.get("improvements")),
        suggestions: string_list(value.get("suggestions")),
    }
}

fn string_list(value: Option<&JsonValue>) -> Vec<String> {
    match value {
        Some(JsonValue::Array(items)) => items
            .iter()
            .filter_map(JsonValue::as_str)
            .map(str::to_string)
            .collect(),
        _ => Vec::new(),
    }
}

// Models occasionally emit `12.0` for counts; rewrite whole floats so the
// integer schema and the unsigned targets accept them.
fn normalize_integral_numbers(kind: ArtifactKind, value: &mut JsonValue) {
    let fields: &[&str] = match kind {
        ArtifactKind::WeeklySummary => &["tasksCompleted", "focusMinutes"],
        ArtifactKind::HabitOptimization => &["currentStreak"],
        ArtifactKind::GoalPlan | ArtifactKind::WeeklyReport => &[],
    };

    if let Some(map) = value.as_object_mut() {
        for field in fields {
            rewrite_whole_float(map, field);
        }
    }
}

fn rewrite_whole_float(map: &mut JsonMap<String, JsonValue>, field: &str) {
    let whole = match map.get(field) {
        Some(JsonValue::Number(number)) if number.is_f64() => number
            .as_f64()
            .filter(|value| value.fract() == 0.0 && *value >= 0.0 && *value <= u64::MAX as f64),
        _ => None,
    };

    if let Some(value) = whole {
        map.insert(field.to_string(), json!(value as u64));
    }
}
