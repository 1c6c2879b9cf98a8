use pipewright::appspec::mapping::split_property_path;
use pipewright::appspec::{
    build_submission, AppSpec, BehaviorSpec, FieldType, GeneratedValue, InputMapping,
    MappingError, ParameterGroup, ParameterSpec, RunContext, SystemVariableMapping, TextOptions,
};
use pipewright::services::{ObjectStore, ResolvedObject, ServiceError};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;

struct FakeObjectStore {
    objects: BTreeMap<String, ResolvedObject>,
}

impl FakeObjectStore {
    fn new() -> Self {
        Self {
            objects: BTreeMap::new(),
        }
    }

    fn with_object(mut self, reference: &str, upa: &str, name: &str) -> Self {
        self.objects.insert(
            reference.to_string(),
            ResolvedObject {
                upa: upa.to_string(),
                name: name.to_string(),
                path: Vec::new(),
            },
        );
        self
    }
}

impl ObjectStore for FakeObjectStore {
    fn resolve(&self, reference: &str) -> Result<ResolvedObject, ServiceError> {
        self.objects
            .get(reference)
            .cloned()
            .ok_or_else(|| ServiceError::NotFound {
                reference: reference.to_string(),
            })
    }

    fn get_objects(&self, _references: &[String]) -> Result<Vec<Value>, ServiceError> {
        Ok(Vec::new())
    }

    fn workspace_name(&self, _workspace_id: i64) -> Result<String, ServiceError> {
        Ok("my_workspace".to_string())
    }
}

fn param(id: &str) -> ParameterSpec {
    ParameterSpec {
        id: id.to_string(),
        ui_name: None,
        field_type: FieldType::Text,
        optional: false,
        allow_multiple: false,
        default_values: Vec::new(),
        text_options: None,
        dropdown_options: None,
    }
}

fn int_param(id: &str) -> ParameterSpec {
    let mut spec = param(id);
    spec.text_options = Some(TextOptions {
        validate_as: Some("int".to_string()),
        ..TextOptions::default()
    });
    spec
}

fn object_param(id: &str) -> ParameterSpec {
    let mut spec = param(id);
    spec.text_options = Some(TextOptions {
        valid_ws_types: vec!["KBaseFile.PairedEndLibrary".to_string()],
        ..TextOptions::default()
    });
    spec
}

fn mapped(id: &str, position: usize, property: Option<&str>) -> InputMapping {
    InputMapping {
        input_parameter: Some(id.to_string()),
        target_argument_position: position,
        target_property: property.map(|p| p.to_string()),
        ..InputMapping::default()
    }
}

fn spec(parameters: Vec<ParameterSpec>, input_mapping: Vec<InputMapping>) -> AppSpec {
    AppSpec {
        app_id: "test_module/test_app".to_string(),
        name: None,
        parameters,
        parameter_groups: Vec::new(),
        behavior: BehaviorSpec {
            method_module: "TestModule".to_string(),
            method_name: "run".to_string(),
            service_version: Some("release".to_string()),
            input_mapping,
            output_mapping: Vec::new(),
            system_variable_mapping: Vec::new(),
        },
    }
}

fn run_ctx() -> RunContext {
    RunContext {
        workspace_id: 42,
        app_tag: "release".to_string(),
    }
}

#[test]
fn mapping_module_rejects_missing_required_parameter() {
    let spec = spec(vec![int_param("min_count")], vec![mapped("min_count", 0, None)]);
    let store = FakeObjectStore::new();

    let err = build_submission(&spec, &Map::new(), &run_ctx(), &store)
        .expect_err("required parameter missing");
    match err {
        MappingError::SpecValidation { parameter_id } => assert_eq!(parameter_id, "min_count"),
        other => panic!("expected SpecValidation, got {other:?}"),
    }
}

#[test]
fn mapping_module_rejects_required_values_that_transform_to_null() {
    let mut entry = mapped("min_count", 0, None);
    entry.target_type_transform = Some("int".to_string());
    let spec = spec(vec![int_param("min_count")], vec![entry]);
    let store = FakeObjectStore::new();
    let mut user_params = Map::new();
    // A blank string coerces to null under the int transform, which a
    // required parameter must not survive.
    user_params.insert("min_count".to_string(), json!(""));

    let err = build_submission(&spec, &user_params, &run_ctx(), &store)
        .expect_err("blank required int");
    match err {
        MappingError::SpecValidation { parameter_id } => assert_eq!(parameter_id, "min_count"),
        other => panic!("expected SpecValidation, got {other:?}"),
    }
}

#[test]
fn mapping_module_fills_positional_gaps_with_null() {
    let mut label = param("label");
    label.optional = true;
    let mut note = param("note");
    note.optional = true;
    let spec = spec(
        vec![label, note],
        vec![mapped("label", 0, None), mapped("note", 2, None)],
    );
    let store = FakeObjectStore::new();
    let mut user_params = Map::new();
    user_params.insert("label".to_string(), json!("hello"));
    user_params.insert("note".to_string(), json!("world"));

    let submission =
        build_submission(&spec, &user_params, &run_ctx(), &store).expect("submission");
    assert_eq!(submission.params, vec![json!("hello"), Value::Null, json!("world")]);
    assert_eq!(submission.method, "TestModule.run");
    assert_eq!(submission.service_ver.as_deref(), Some("release"));
    assert_eq!(submission.wsid, 42);
    assert_eq!(submission.meta.tag, "release");
    assert!(!submission.meta.cell_id.is_empty());
    assert_ne!(submission.meta.cell_id, submission.meta.run_id);
}

#[test]
fn mapping_module_merges_entries_into_one_argument_object() {
    let mut label = param("label");
    label.optional = true;
    let mut note = param("note");
    note.optional = true;
    let spec = spec(
        vec![label, note],
        vec![
            mapped("label", 0, Some("outer/label")),
            mapped("note", 0, Some("outer/note")),
        ],
    );
    let store = FakeObjectStore::new();
    let mut user_params = Map::new();
    user_params.insert("label".to_string(), json!("hello"));
    user_params.insert("note".to_string(), json!("world"));

    let submission =
        build_submission(&spec, &user_params, &run_ctx(), &store).expect("submission");
    assert_eq!(
        submission.params,
        vec![json!({"outer": {"label": "hello", "note": "world"}})]
    );
}

#[test]
fn mapping_module_honors_property_path_escapes() {
    assert_eq!(split_property_path("a/b/c"), vec!["a", "b", "c"]);
    assert_eq!(split_property_path(r"a\/b/c"), vec!["a/b", "c"]);
    assert_eq!(split_property_path(r"a\\b/c"), vec![r"a\b", "c"]);
    assert_eq!(split_property_path("single"), vec!["single"]);
}

#[test]
fn mapping_module_applies_defaults_constants_and_system_variables() {
    let mut min_count = int_param("min_count");
    min_count.default_values = vec!["5".to_string()];
    let spec = spec(
        vec![min_count],
        vec![
            mapped("min_count", 0, Some("min_count")),
            InputMapping {
                constant_value: Some(json!("fixed")),
                target_argument_position: 0,
                target_property: Some("mode".to_string()),
                ..InputMapping::default()
            },
            InputMapping {
                system_variable: Some("workspace".to_string()),
                target_argument_position: 0,
                target_property: Some("workspace".to_string()),
                ..InputMapping::default()
            },
        ],
    );
    let store = FakeObjectStore::new();

    let submission = build_submission(&spec, &Map::new(), &run_ctx(), &store).expect("submission");
    assert_eq!(
        submission.params,
        vec![json!({"min_count": 5, "mode": "fixed", "workspace": "my_workspace"})]
    );
}

#[test]
fn mapping_module_places_system_variable_table_entries() {
    let mut spec = spec(Vec::new(), Vec::new());
    spec.behavior.system_variable_mapping = vec![SystemVariableMapping {
        system_variable: "workspace_id".to_string(),
        target_argument_position: 0,
        target_property: Some("wsid".to_string()),
    }];
    let store = FakeObjectStore::new();

    let submission = build_submission(&spec, &Map::new(), &run_ctx(), &store).expect("submission");
    assert_eq!(submission.params, vec![json!({"wsid": 42})]);
}

#[test]
fn mapping_module_generates_names_with_prefix_and_suffix() {
    let spec = spec(
        Vec::new(),
        vec![InputMapping {
            generated_value: Some(GeneratedValue {
                prefix: Some("out_".to_string()),
                symbols: Some(4),
                suffix: Some("_obj".to_string()),
            }),
            target_argument_position: 0,
            ..InputMapping::default()
        }],
    );
    let store = FakeObjectStore::new();

    let submission = build_submission(&spec, &Map::new(), &run_ctx(), &store).expect("submission");
    let generated = submission.params[0].as_str().expect("generated string");
    assert!(generated.starts_with("out_"));
    assert!(generated.ends_with("_obj"));
    let middle = &generated["out_".len()..generated.len() - "_obj".len()];
    assert_eq!(middle.len(), 4);
    assert!(middle.chars().all(|ch| ch.is_ascii_uppercase()));
}

#[test]
fn mapping_module_rejects_nonpositive_symbol_counts() {
    let spec = spec(
        Vec::new(),
        vec![InputMapping {
            generated_value: Some(GeneratedValue {
                prefix: None,
                symbols: Some(0),
                suffix: None,
            }),
            target_argument_position: 0,
            ..InputMapping::default()
        }],
    );
    let store = FakeObjectStore::new();

    let err = build_submission(&spec, &Map::new(), &run_ctx(), &store).expect_err("zero symbols");
    assert!(matches!(err, MappingError::Generation { .. }));
}

#[test]
fn mapping_module_applies_implicit_ref_transform_to_object_inputs() {
    let spec = spec(
        vec![object_param("reads")],
        vec![mapped("reads", 0, Some("reads_ref"))],
    );
    let store = FakeObjectStore::new().with_object("my_workspace/reads_1", "8/2/1", "reads_1");
    let mut user_params = Map::new();
    user_params.insert("reads".to_string(), json!("reads_1"));

    let submission =
        build_submission(&spec, &user_params, &run_ctx(), &store).expect("submission");
    assert_eq!(
        submission.params,
        vec![json!({"reads_ref": "my_workspace/reads_1"})]
    );
}

#[test]
fn mapping_module_collects_source_objects_without_duplicates() {
    let mut reads = object_param("reads");
    reads.allow_multiple = true;
    let spec = spec(
        vec![reads],
        vec![mapped("reads", 0, Some("reads_refs"))],
    );
    let store = FakeObjectStore::new();
    let mut user_params = Map::new();
    user_params.insert(
        "reads".to_string(),
        json!(["ws/obj1", "2/3/4", "ws/obj1"]),
    );

    let submission =
        build_submission(&spec, &user_params, &run_ctx(), &store).expect("submission");
    assert_eq!(
        submission.source_ws_objects,
        vec!["ws/obj1".to_string(), "2/3/4".to_string()]
    );
}

#[test]
fn mapping_module_expands_groups_from_members_and_defaults() {
    let mut threshold = int_param("threshold");
    threshold.default_values = vec!["3".to_string()];
    let label = param("label");
    let mut spec = spec(
        vec![threshold, label],
        vec![mapped("filtering", 0, Some("filtering"))],
    );
    spec.parameter_groups = vec![ParameterGroup {
        id: "filtering".to_string(),
        parameter_ids: vec!["threshold".to_string(), "label".to_string()],
        optional: false,
        allow_multiple: false,
    }];
    let store = FakeObjectStore::new();
    let mut user_params = Map::new();
    user_params.insert("label".to_string(), json!("strict"));

    let submission =
        build_submission(&spec, &user_params, &run_ctx(), &store).expect("submission");
    assert_eq!(
        submission.params,
        vec![json!({"filtering": {"threshold": 3, "label": "strict"}})]
    );
}

#[test]
fn mapping_module_group_expansion_respects_optionality() {
    let label = param("label");
    let mut spec = spec(vec![label], vec![mapped("filtering", 0, None)]);
    spec.parameter_groups = vec![ParameterGroup {
        id: "filtering".to_string(),
        parameter_ids: vec!["label".to_string()],
        optional: false,
        allow_multiple: false,
    }];
    let store = FakeObjectStore::new();

    let err = build_submission(&spec, &Map::new(), &run_ctx(), &store)
        .expect_err("required group with no members set");
    match err {
        MappingError::SpecValidation { parameter_id } => assert_eq!(parameter_id, "filtering"),
        other => panic!("expected SpecValidation, got {other:?}"),
    }

    spec.parameter_groups[0].optional = true;
    let submission = build_submission(&spec, &Map::new(), &run_ctx(), &store)
        .expect("optional group resolves to null");
    assert_eq!(submission.params, vec![Value::Null]);
}

#[test]
fn mapping_module_prefers_prebuilt_group_values() {
    let label = param("label");
    let mut spec = spec(vec![label], vec![mapped("filtering", 0, None)]);
    spec.parameter_groups = vec![ParameterGroup {
        id: "filtering".to_string(),
        parameter_ids: vec!["label".to_string()],
        optional: false,
        allow_multiple: true,
    }];
    let store = FakeObjectStore::new();
    let mut user_params = Map::new();
    user_params.insert(
        "filtering".to_string(),
        json!([{"label": "a"}, {"label": "b"}]),
    );

    let submission =
        build_submission(&spec, &user_params, &run_ctx(), &store).expect("submission");
    assert_eq!(submission.params, vec![json!([{"label": "a"}, {"label": "b"}])]);
}
