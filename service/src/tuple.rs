use std::fmt;

use serde::{Serialize, Serializer, ser::SerializeTuple as _};
use serde_json::{Map, Value};

use crate::collection::Entry;

#[derive(Clone, Debug, PartialEq)]
pub struct NamedDefinition {
    pub name: String,
    pub definition: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HookTupleKind {
    Resource,
    Function,
    EnvVars,
    IamStatement,
}

impl HookTupleKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Resource => "resource",
            Self::Function => "function",
            Self::EnvVars => "envVars",
            Self::IamStatement => "iamStatement",
        }
    }
}

impl fmt::Display for HookTupleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One contribution produced by a topology builder, in declaration order.
///
/// Serialized as a `[kind, payload]` pair.
#[derive(Clone, Debug, PartialEq)]
pub enum HookTuple {
    Resource(NamedDefinition),
    Function(NamedDefinition),
    EnvVars(Map<String, Value>),
    IamStatement(Value),
}

impl HookTuple {
    pub fn resource(name: impl Into<String>, definition: Value) -> Self {
        Self::Resource(NamedDefinition {
            name: name.into(),
            definition,
        })
    }

    pub fn function(name: impl Into<String>, definition: Value) -> Self {
        Self::Function(NamedDefinition {
            name: name.into(),
            definition,
        })
    }

    pub fn kind(&self) -> HookTupleKind {
        match self {
            Self::Resource(_) => HookTupleKind::Resource,
            Self::Function(_) => HookTupleKind::Function,
            Self::EnvVars(_) => HookTupleKind::EnvVars,
            Self::IamStatement(_) => HookTupleKind::IamStatement,
        }
    }

    /// Logical name of a resource or function tuple.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Resource(named) | Self::Function(named) => Some(&named.name),
            Self::EnvVars(_) | Self::IamStatement(_) => None,
        }
    }

    pub fn definition(&self) -> Option<&Value> {
        match self {
            Self::Resource(named) | Self::Function(named) => Some(&named.definition),
            Self::EnvVars(_) | Self::IamStatement(_) => None,
        }
    }
}

impl Serialize for HookTuple {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(self.kind().as_str())?;
        match self {
            Self::Resource(named) | Self::Function(named) => {
                tuple.serialize_element(&Entry::new(named.name.clone(), named.definition.clone()))?
            }
            Self::EnvVars(vars) => tuple.serialize_element(vars)?,
            Self::IamStatement(statement) => tuple.serialize_element(statement)?,
        }
        tuple.end()
    }
}
