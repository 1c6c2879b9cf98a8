use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Declarative description of a remote app: its user-facing parameters, the
/// parameter groups, and the behavior block that maps parameter values onto
/// the remote service method signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSpec {
    pub app_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterSpec>,
    #[serde(default)]
    pub parameter_groups: Vec<ParameterGroup>,
    pub behavior: BehaviorSpec,
}

impl AppSpec {
    pub fn parameter(&self, id: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|param| param.id == id)
    }

    pub fn group(&self, id: &str) -> Option<&ParameterGroup> {
        self.parameter_groups.iter().find(|group| group.id == id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Textarea,
    Intslider,
    Floatslider,
    Checkbox,
    Dropdown,
    Radio,
    Tab,
    File,
    DynamicDropdown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub id: String,
    #[serde(default)]
    pub ui_name: Option<String>,
    pub field_type: FieldType,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub allow_multiple: bool,
    #[serde(default)]
    pub default_values: Vec<String>,
    #[serde(default)]
    pub text_options: Option<TextOptions>,
    #[serde(default)]
    pub dropdown_options: Option<DropdownOptions>,
}

impl ParameterSpec {
    /// True when the field references typed objects in the store, either as an
    /// input selector or as an output name field.
    pub fn is_object_field(&self) -> bool {
        self.text_options
            .as_ref()
            .map(|options| !options.valid_ws_types.is_empty())
            .unwrap_or(false)
    }

    pub fn is_output_name(&self) -> bool {
        self.is_object_field()
            && self
                .text_options
                .as_ref()
                .map(|options| options.is_output_name)
                .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextOptions {
    #[serde(default)]
    pub valid_ws_types: Vec<String>,
    #[serde(default)]
    pub validate_as: Option<String>,
    #[serde(default)]
    pub is_output_name: bool,
    #[serde(default)]
    pub regex_constraint: Option<String>,
    #[serde(default)]
    pub min_int: Option<i64>,
    #[serde(default)]
    pub max_int: Option<i64>,
    #[serde(default)]
    pub min_float: Option<f64>,
    #[serde(default)]
    pub max_float: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DropdownOptions {
    #[serde(default)]
    pub options: Vec<DropdownItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DropdownItem {
    pub value: String,
    pub display: String,
}

/// A named group of parameters. A parameter id may belong to at most one
/// group; membership exclusivity is enforced at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGroup {
    pub id: String,
    #[serde(default)]
    pub parameter_ids: Vec<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub allow_multiple: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSpec {
    pub method_module: String,
    pub method_name: String,
    #[serde(default)]
    pub service_version: Option<String>,
    #[serde(default)]
    pub input_mapping: Vec<InputMapping>,
    #[serde(default)]
    pub output_mapping: Vec<OutputMapping>,
    #[serde(default)]
    pub system_variable_mapping: Vec<SystemVariableMapping>,
}

impl BehaviorSpec {
    pub fn method(&self) -> String {
        format!("{}.{}", self.method_module, self.method_name)
    }

    pub fn input_mapping_for(&self, parameter_id: &str) -> Option<&InputMapping> {
        self.input_mapping
            .iter()
            .find(|entry| entry.input_parameter.as_deref() == Some(parameter_id))
    }
}

/// One entry of the input-mapping table. Mappings are the iteration axis of
/// submission building: one user parameter may fan out to several entries, and
/// several entries may land in the same target position.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputMapping {
    #[serde(default)]
    pub input_parameter: Option<String>,
    #[serde(default)]
    pub constant_value: Option<Value>,
    #[serde(default)]
    pub system_variable: Option<String>,
    #[serde(default)]
    pub generated_value: Option<GeneratedValue>,
    #[serde(default)]
    pub target_argument_position: usize,
    #[serde(default)]
    pub target_property: Option<String>,
    #[serde(default)]
    pub target_type_transform: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedValue {
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub symbols: Option<i64>,
    #[serde(default)]
    pub suffix: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputMapping {
    #[serde(default)]
    pub service_method_output_path: Vec<String>,
    #[serde(default)]
    pub target_property: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemVariableMapping {
    pub system_variable: String,
    #[serde(default)]
    pub target_argument_position: usize,
    #[serde(default)]
    pub target_property: Option<String>,
}
