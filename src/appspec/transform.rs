use crate::appspec::error::MappingError;
use crate::services::ObjectStore;
use crate::shared::refs::{is_ref, is_upa, is_upa_path, join_ref};
use serde_json::Value;

/// A declared target type transform from the behavior's mapping tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// `ref` / `unresolved-ref`: a bare `workspace/object` reference.
    Ref,
    /// `putative-ref`: like `Ref`, but tolerates objects that do not exist
    /// yet by returning the still-unresolved `workspace/value` pair.
    PutativeRef,
    /// `resolved-ref` / `upa`: the fully-qualified `wsid/objid/ver` form.
    ResolvedRef,
    /// `string`: stringify scalars, comma-join lists, `k=v` comma-join maps.
    AsString,
    /// `int`: parse, or null on empty/blank input.
    AsInt,
    /// `list<T>`: apply `T` to every element, wrapping scalars.
    List(Box<Transform>),
}

impl Transform {
    pub fn parse(raw: &str) -> Result<Self, MappingError> {
        let trimmed = raw.trim();
        if let Some(inner) = trimmed
            .strip_prefix("list<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            return Ok(Self::List(Box::new(Self::parse(inner)?)));
        }
        match trimmed {
            "ref" | "unresolved-ref" => Ok(Self::Ref),
            "putative-ref" => Ok(Self::PutativeRef),
            "resolved-ref" | "upa" => Ok(Self::ResolvedRef),
            "string" => Ok(Self::AsString),
            "int" => Ok(Self::AsInt),
            other => Err(MappingError::UnsupportedTransform {
                transform: other.to_string(),
            }),
        }
    }
}

pub struct TransformContext<'a> {
    pub object_store: &'a dyn ObjectStore,
    /// Name of the run's workspace; bare object names resolve inside it.
    pub workspace_name: &'a str,
}

pub fn apply_transform(
    transform: &Transform,
    value: &Value,
    ctx: &TransformContext<'_>,
) -> Result<Value, MappingError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    match transform {
        Transform::Ref => map_string_values(value, |raw| to_ref(raw, ctx, false)),
        Transform::PutativeRef => map_string_values(value, |raw| to_ref(raw, ctx, true)),
        Transform::ResolvedRef => map_string_values(value, |raw| to_upa(raw, ctx)),
        Transform::AsString => to_string_value(value),
        Transform::AsInt => to_int_value(value),
        Transform::List(inner) => {
            let items = match value {
                Value::Array(items) => items.clone(),
                scalar => vec![scalar.clone()],
            };
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(apply_transform(inner, &item, ctx)?);
            }
            Ok(Value::Array(mapped))
        }
    }
}

/// Ref-family transforms accept arrays from multi-valued parameters even
/// without an explicit `list<>` wrapper.
fn map_string_values(
    value: &Value,
    apply: impl Fn(&str) -> Result<String, MappingError> + Copy,
) -> Result<Value, MappingError> {
    match value {
        Value::String(raw) => Ok(Value::String(apply(raw)?)),
        Value::Array(items) => {
            let mut mapped = Vec::with_capacity(items.len());
            for item in items {
                mapped.push(map_string_values(item, apply)?);
            }
            Ok(Value::Array(mapped))
        }
        other => Err(MappingError::Coercion {
            value: other.to_string(),
            target: "object reference".to_string(),
        }),
    }
}

fn to_ref(
    raw: &str,
    ctx: &TransformContext<'_>,
    tolerate_missing: bool,
) -> Result<String, MappingError> {
    let trimmed = raw.trim();
    // Already a workspace/object reference, or an UPA (a superset of refs).
    if is_ref(trimmed) || is_upa_path(trimmed) {
        return Ok(trimmed.to_string());
    }
    let reference = join_ref(ctx.workspace_name, trimmed);
    match ctx.object_store.resolve(&reference) {
        Ok(resolved) => Ok(join_ref(ctx.workspace_name, &resolved.name)),
        Err(err) if tolerate_missing && err.is_not_found() => Ok(reference),
        Err(err) => Err(MappingError::ReferenceResolution {
            reference,
            reason: err.to_string(),
        }),
    }
}

fn to_upa(raw: &str, ctx: &TransformContext<'_>) -> Result<String, MappingError> {
    let trimmed = raw.trim();
    if is_upa(trimmed) || is_upa_path(trimmed) {
        return Ok(trimmed.to_string());
    }
    let reference = if trimmed.contains('/') {
        trimmed.to_string()
    } else {
        join_ref(ctx.workspace_name, trimmed)
    };
    match ctx.object_store.resolve(&reference) {
        Ok(resolved) => {
            if resolved.path.len() > 1 {
                Ok(resolved.path.join(";"))
            } else {
                Ok(resolved.upa)
            }
        }
        Err(err) => Err(MappingError::ReferenceResolution {
            reference,
            reason: err.to_string(),
        }),
    }
}

fn to_string_value(value: &Value) -> Result<Value, MappingError> {
    let rendered = match value {
        Value::String(raw) => raw.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Array(items) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                parts.push(scalar_to_string(item)?);
            }
            parts.join(",")
        }
        Value::Object(map) => {
            let mut parts = Vec::with_capacity(map.len());
            for (key, item) in map {
                parts.push(format!("{key}={}", scalar_to_string(item)?));
            }
            parts.join(",")
        }
        Value::Null => return Ok(Value::Null),
    };
    Ok(Value::String(rendered))
}

fn scalar_to_string(value: &Value) -> Result<String, MappingError> {
    match value {
        Value::String(raw) => Ok(raw.clone()),
        Value::Number(number) => Ok(number.to_string()),
        Value::Bool(flag) => Ok(flag.to_string()),
        other => Err(MappingError::Coercion {
            value: other.to_string(),
            target: "string".to_string(),
        }),
    }
}

fn to_int_value(value: &Value) -> Result<Value, MappingError> {
    match value {
        Value::Number(number) => Ok(Value::Number(number.clone())),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(Value::Null);
            }
            trimmed
                .parse::<i64>()
                .map(Value::from)
                .map_err(|_| MappingError::Coercion {
                    value: raw.clone(),
                    target: "int".to_string(),
                })
        }
        other => Err(MappingError::Coercion {
            value: other.to_string(),
            target: "int".to_string(),
        }),
    }
}
