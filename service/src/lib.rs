#![forbid(unsafe_code)]

mod collection;
mod config;
mod context;
mod error;
pub mod merge;
mod tuple;

pub use collection::{Entry, FunctionList, ResourceCollection, ResourceContainer, add_resource};
pub use config::{PluginSet, ServiceConfig, StepFunctions};
pub use context::BuildContext;
pub use error::{Result, ValidationError};
pub use tuple::{HookTuple, HookTupleKind, NamedDefinition};
