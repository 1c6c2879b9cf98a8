pub mod error;
pub mod mapping;
pub mod model;
pub mod normalize;
pub mod transform;

pub use error::MappingError;
pub use mapping::{build_submission, RunContext};
pub use model::{
    AppSpec, BehaviorSpec, DropdownItem, DropdownOptions, FieldType, GeneratedValue, InputMapping,
    OutputMapping, ParameterGroup, ParameterSpec, SystemVariableMapping, TextOptions,
};
pub use normalize::{normalize, Choice, NormalizeOptions, ParamDescriptor, ParamKind};
pub use transform::Transform;
