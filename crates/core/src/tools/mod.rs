//! Tool declarations, validation and dispatch.

pub mod registry;
pub mod schema;
pub mod tattoo;

pub use registry::{
    ErrorKind, InvocationError, RegistrationError, ToolDescriptor, ToolHandler, ToolOutcome,
    ToolRegistry,
};
pub use schema::{FieldSpec, FieldType, InputShape, ValidationError};
pub use tattoo::build_registry;
