use crate::appspec::error::MappingError;
use crate::appspec::model::{AppSpec, GeneratedValue, InputMapping};
use crate::appspec::normalize::{normalize, NormalizeOptions};
use crate::appspec::transform::{apply_transform, Transform, TransformContext};
use crate::jobs::{JobMeta, JobSubmission};
use crate::services::ObjectStore;
use crate::shared::random::random_uppercase_symbols;
use crate::shared::refs::{is_ref, is_upa_path};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const DEFAULT_GENERATED_SYMBOLS: i64 = 8;

/// Per-run identifiers threaded into every submission built for the run.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub workspace_id: i64,
    pub app_tag: String,
}

/// Materializes a submission from the behavior's mapping tables and the
/// user-supplied values. Mapping entries are the iteration axis: one user
/// parameter may fan out to several target positions and several entries may
/// merge into one positional argument object.
pub fn build_submission(
    spec: &AppSpec,
    user_params: &Map<String, Value>,
    ctx: &RunContext,
    object_store: &dyn ObjectStore,
) -> Result<JobSubmission, MappingError> {
    // Fail fast on malformed group declarations before touching any value.
    let descriptors = normalize(spec, &NormalizeOptions { nest_groups: false })?;
    let defaults: BTreeMap<&str, Option<Value>> = descriptors
        .iter()
        .map(|descriptor| (descriptor.id.as_str(), descriptor.default.clone()))
        .collect();

    let workspace_name = object_store.workspace_name(ctx.workspace_id)?;
    let transform_ctx = TransformContext {
        object_store,
        workspace_name: &workspace_name,
    };

    let mut positions: BTreeMap<usize, Value> = BTreeMap::new();
    for entry in &spec.behavior.input_mapping {
        let raw = resolve_entry_value(spec, entry, user_params, &defaults, ctx, &workspace_name)?;
        let value = apply_entry_transform(spec, entry, raw, &transform_ctx)?;
        // Checked after the transform: a blank string fed to an int transform
        // resolves to null and a required parameter must not reach the
        // submission that way.
        if let Some(parameter_id) = entry.input_parameter.as_deref() {
            check_required(spec, parameter_id, &value)?;
        }
        place_value(
            &mut positions,
            entry.target_argument_position,
            entry.target_property.as_deref(),
            value,
        );
    }
    for entry in &spec.behavior.system_variable_mapping {
        let value = resolve_system_variable(&entry.system_variable, ctx, &workspace_name);
        place_value(
            &mut positions,
            entry.target_argument_position,
            entry.target_property.as_deref(),
            value,
        );
    }

    let params = match positions.keys().next_back() {
        Some(&last) => (0..=last)
            .map(|position| positions.remove(&position).unwrap_or(Value::Null))
            .collect(),
        None => Vec::new(),
    };

    Ok(JobSubmission {
        method: spec.behavior.method(),
        service_ver: spec.behavior.service_version.clone(),
        params,
        app_id: spec.app_id.clone(),
        wsid: ctx.workspace_id,
        meta: JobMeta {
            cell_id: uuid::Uuid::new_v4().to_string(),
            run_id: uuid::Uuid::new_v4().to_string(),
            tag: ctx.app_tag.clone(),
        },
        source_ws_objects: collect_source_objects(spec, user_params),
    })
}

/// Value priority: input parameter (with group expansion) -> constant ->
/// system variable -> generated value. Absent everywhere resolves to null.
fn resolve_entry_value(
    spec: &AppSpec,
    entry: &InputMapping,
    user_params: &Map<String, Value>,
    defaults: &BTreeMap<&str, Option<Value>>,
    ctx: &RunContext,
    workspace_name: &str,
) -> Result<Value, MappingError> {
    if let Some(parameter_id) = entry.input_parameter.as_deref() {
        if spec.group(parameter_id).is_some() {
            return expand_group(spec, parameter_id, user_params, defaults);
        }
        if let Some(value) = user_params.get(parameter_id) {
            if !value.is_null() {
                return Ok(value.clone());
            }
        }
        if let Some(Some(default)) = defaults.get(parameter_id) {
            return Ok(default.clone());
        }
        // Fall through: a constant may still back an unset parameter.
    }
    if let Some(constant) = &entry.constant_value {
        return Ok(constant.clone());
    }
    if let Some(variable) = entry.system_variable.as_deref() {
        return Ok(resolve_system_variable(variable, ctx, workspace_name));
    }
    if let Some(generated) = &entry.generated_value {
        return generate_value(generated).map(Value::String);
    }
    Ok(Value::Null)
}

fn expand_group(
    spec: &AppSpec,
    group_id: &str,
    user_params: &Map<String, Value>,
    defaults: &BTreeMap<&str, Option<Value>>,
) -> Result<Value, MappingError> {
    // A pre-built group value (object, or array of objects when the group
    // repeats) wins over member-by-member expansion.
    if let Some(value) = user_params.get(group_id) {
        if !value.is_null() {
            return Ok(value.clone());
        }
    }

    let Some(group) = spec.group(group_id) else {
        return Ok(Value::Null);
    };
    let mut members = Map::new();
    for parameter_id in &group.parameter_ids {
        let value = user_params
            .get(parameter_id)
            .filter(|value| !value.is_null())
            .cloned()
            .or_else(|| defaults.get(parameter_id.as_str()).cloned().flatten());
        if let Some(value) = value {
            members.insert(parameter_id.clone(), value);
        }
    }
    if members.is_empty() {
        if group.optional {
            return Ok(Value::Null);
        }
        return Err(MappingError::SpecValidation {
            parameter_id: group_id.to_string(),
        });
    }
    Ok(Value::Object(members))
}

fn check_required(spec: &AppSpec, parameter_id: &str, value: &Value) -> Result<(), MappingError> {
    let Some(param) = spec.parameter(parameter_id) else {
        return Ok(());
    };
    if !param.optional && value.is_null() {
        return Err(MappingError::SpecValidation {
            parameter_id: parameter_id.to_string(),
        });
    }
    Ok(())
}

fn apply_entry_transform(
    spec: &AppSpec,
    entry: &InputMapping,
    value: Value,
    ctx: &TransformContext<'_>,
) -> Result<Value, MappingError> {
    let transform = match entry.target_type_transform.as_deref() {
        Some(raw) => Some(Transform::parse(raw)?),
        // An untransformed object-typed parameter still yields a bare
        // name/path reference.
        None => entry
            .input_parameter
            .as_deref()
            .and_then(|id| spec.parameter(id))
            .filter(|param| param.is_object_field() && !param.is_output_name())
            .map(|_| Transform::Ref),
    };
    match transform {
        Some(transform) => apply_transform(&transform, &value, ctx),
        None => Ok(value),
    }
}

pub fn resolve_system_variable(variable: &str, ctx: &RunContext, workspace_name: &str) -> Value {
    match variable {
        "workspace" => Value::String(workspace_name.to_string()),
        "workspace_id" => Value::from(ctx.workspace_id),
        "timestamp_epoch_ms" => Value::from(chrono::Utc::now().timestamp_millis()),
        "timestamp_epoch_sec" => Value::from(chrono::Utc::now().timestamp()),
        // user_id is unsupported by the mapping engine.
        _ => Value::String(String::new()),
    }
}

fn generate_value(generated: &GeneratedValue) -> Result<String, MappingError> {
    let symbols = generated.symbols.unwrap_or(DEFAULT_GENERATED_SYMBOLS);
    if symbols < 1 {
        return Err(MappingError::Generation {
            reason: format!("symbol count must be at least 1, got {symbols}"),
        });
    }
    let random = random_uppercase_symbols(symbols as usize)
        .map_err(|reason| MappingError::Generation { reason })?;
    Ok(format!(
        "{}{random}{}",
        generated.prefix.as_deref().unwrap_or(""),
        generated.suffix.as_deref().unwrap_or("")
    ))
}

/// Splits a `/`-delimited target property path, honoring `\/` and `\\`
/// escapes inside path segments.
pub fn split_property_path(path: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('/') => current.push('/'),
                Some('\\') => current.push('\\'),
                Some(other) => {
                    current.push('\\');
                    current.push(other);
                }
                None => current.push('\\'),
            },
            '/' => parts.push(std::mem::take(&mut current)),
            other => current.push(other),
        }
    }
    parts.push(current);
    parts
}

fn place_value(
    positions: &mut BTreeMap<usize, Value>,
    position: usize,
    property: Option<&str>,
    value: Value,
) {
    match property {
        None => {
            positions.insert(position, value);
        }
        Some(path) => {
            let slot = positions
                .entry(position)
                .or_insert_with(|| Value::Object(Map::new()));
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            insert_at_path(slot, &split_property_path(path), value);
        }
    }
}

fn insert_at_path(target: &mut Value, path: &[String], value: Value) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let Some(map) = target.as_object_mut() else {
        return;
    };
    if rest.is_empty() {
        map.insert(head.clone(), value);
        return;
    }
    let child = map
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !child.is_object() {
        *child = Value::Object(Map::new());
    }
    insert_at_path(child, rest, value);
}

/// Input data objects referenced by the user become the submission's
/// provenance list. Output name fields are excluded; they do not exist yet.
fn collect_source_objects(spec: &AppSpec, user_params: &Map<String, Value>) -> Vec<String> {
    let mut sources = Vec::new();
    for param in &spec.parameters {
        if !param.is_object_field() || param.is_output_name() {
            continue;
        }
        let Some(value) = user_params.get(&param.id) else {
            continue;
        };
        collect_reference_strings(value, &mut sources);
    }
    sources
}

fn collect_reference_strings(value: &Value, sources: &mut Vec<String>) {
    match value {
        Value::String(raw) => {
            let trimmed = raw.trim();
            if (is_ref(trimmed) || is_upa_path(trimmed)) && !sources.iter().any(|s| s == trimmed) {
                sources.push(trimmed.to_string());
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_reference_strings(item, sources);
            }
        }
        _ => {}
    }
}
