pub mod cnae;
mod registry;

pub use cnae::{register_cnae_tools, CnaeOperation, CnaeTool};
pub use registry::{
    json_schema_array, json_schema_integer, json_schema_object, json_schema_string, Tool,
    ToolRegistry,
};
