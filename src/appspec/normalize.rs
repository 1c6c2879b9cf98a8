use crate::appspec::error::MappingError;
use crate::appspec::model::{AppSpec, FieldType, ParameterSpec};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// When set, grouped parameters are removed from the flat list and nested
    /// under a `Group` descriptor carrying the group id.
    pub nest_groups: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self { nest_groups: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    Text,
    Int { min: i64, max: i64 },
    Float { min: f64, max: f64 },
    Checkbox,
    DataObject { types: Vec<String> },
    Dropdown { choices: Vec<Choice> },
    File,
    Group { members: Vec<ParamDescriptor> },
}

impl ParamKind {
    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Int { .. } | Self::Float { .. })
    }
}

/// A parameter with its inferred, richer type. The raw UI field type only says
/// how the value is entered; the descriptor says what the value *is*.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamDescriptor {
    pub id: String,
    pub title: String,
    pub kind: ParamKind,
    pub optional: bool,
    pub multiple: bool,
    pub is_output_object: bool,
    pub default: Option<Value>,
    pub group: Option<String>,
}

/// Fails when a parameter id belongs to more than one group or a group names
/// an undeclared parameter. Called before any normalization output is built.
pub fn validate_groups(spec: &AppSpec) -> Result<(), MappingError> {
    let mut memberships: BTreeMap<&str, &str> = BTreeMap::new();
    for group in &spec.parameter_groups {
        for parameter_id in &group.parameter_ids {
            if spec.parameter(parameter_id).is_none() {
                return Err(MappingError::InvalidSpec {
                    app_id: spec.app_id.clone(),
                    reason: format!(
                        "group `{}` references undeclared parameter `{parameter_id}`",
                        group.id
                    ),
                });
            }
            if let Some(previous) = memberships.insert(parameter_id, &group.id) {
                return Err(MappingError::InvalidSpec {
                    app_id: spec.app_id.clone(),
                    reason: format!(
                        "parameter `{parameter_id}` belongs to both group `{previous}` and group `{}`",
                        group.id
                    ),
                });
            }
        }
    }
    Ok(())
}

pub fn normalize(
    spec: &AppSpec,
    options: &NormalizeOptions,
) -> Result<Vec<ParamDescriptor>, MappingError> {
    validate_groups(spec)?;

    let group_of = |parameter_id: &str| -> Option<String> {
        spec.parameter_groups
            .iter()
            .find(|group| group.parameter_ids.iter().any(|id| id == parameter_id))
            .map(|group| group.id.clone())
    };

    let mut flat = Vec::new();
    for param in &spec.parameters {
        let group = group_of(&param.id);
        let descriptor = describe_parameter(param, group.clone());
        if options.nest_groups && group.is_some() {
            continue;
        }
        flat.push(descriptor);
    }

    if options.nest_groups {
        for group in &spec.parameter_groups {
            let members = group
                .parameter_ids
                .iter()
                .filter_map(|id| spec.parameter(id))
                .map(|param| describe_parameter(param, Some(group.id.clone())))
                .collect();
            flat.push(ParamDescriptor {
                id: group.id.clone(),
                title: group.id.clone(),
                kind: ParamKind::Group { members },
                optional: group.optional,
                multiple: group.allow_multiple,
                is_output_object: false,
                default: None,
                group: None,
            });
        }
    }

    Ok(flat)
}

fn describe_parameter(param: &ParameterSpec, group: Option<String>) -> ParamDescriptor {
    let kind = infer_kind(param);
    let is_output_object =
        matches!(kind, ParamKind::DataObject { .. }) && param.is_output_name();
    ParamDescriptor {
        id: param.id.clone(),
        title: param.ui_name.clone().unwrap_or_else(|| param.id.clone()),
        default: cast_default(param, &kind),
        optional: param.optional,
        multiple: param.allow_multiple,
        is_output_object,
        kind,
        group,
    }
}

fn infer_kind(param: &ParameterSpec) -> ParamKind {
    if param.is_object_field() {
        let types = param
            .text_options
            .as_ref()
            .map(|options| options.valid_ws_types.clone())
            .unwrap_or_default();
        return ParamKind::DataObject { types };
    }

    match param.field_type {
        FieldType::Checkbox => ParamKind::Checkbox,
        FieldType::File => ParamKind::File,
        FieldType::Dropdown | FieldType::Radio => ParamKind::Dropdown {
            choices: param
                .dropdown_options
                .as_ref()
                .map(|options| {
                    options
                        .options
                        .iter()
                        .map(|item| Choice {
                            name: item.display.clone(),
                            value: item.value.clone(),
                        })
                        .collect()
                })
                .unwrap_or_default(),
        },
        FieldType::Intslider => int_kind(param),
        FieldType::Floatslider => float_kind(param),
        FieldType::Text | FieldType::Textarea | FieldType::Tab | FieldType::DynamicDropdown => {
            match param
                .text_options
                .as_ref()
                .and_then(|options| options.validate_as.as_deref())
            {
                Some("int") => int_kind(param),
                Some("float") => float_kind(param),
                _ => ParamKind::Text,
            }
        }
    }
}

fn int_kind(param: &ParameterSpec) -> ParamKind {
    let options = param.text_options.as_ref();
    ParamKind::Int {
        min: options.and_then(|o| o.min_int).unwrap_or(i64::MIN),
        max: options.and_then(|o| o.max_int).unwrap_or(i64::MAX),
    }
}

fn float_kind(param: &ParameterSpec) -> ParamKind {
    let options = param.text_options.as_ref();
    ParamKind::Float {
        min: options
            .and_then(|o| o.min_float)
            .unwrap_or(f64::NEG_INFINITY),
        max: options.and_then(|o| o.max_float).unwrap_or(f64::INFINITY),
    }
}

/// Casts the first declared default per the inferred type. An empty string or
/// the literal `"null"` means absent, never zero.
pub fn cast_default(param: &ParameterSpec, kind: &ParamKind) -> Option<Value> {
    let raw = param.default_values.first()?.trim();
    if raw.is_empty() || raw == "null" {
        return None;
    }
    match kind {
        ParamKind::Int { .. } => raw.parse::<i64>().ok().map(Value::from),
        ParamKind::Float { .. } => raw.parse::<f64>().ok().map(Value::from),
        ParamKind::Checkbox => match raw {
            "1" | "true" => Some(Value::from(1)),
            "0" | "false" => Some(Value::from(0)),
            _ => None,
        },
        ParamKind::Group { .. } => None,
        _ => Some(Value::String(raw.to_string())),
    }
}
