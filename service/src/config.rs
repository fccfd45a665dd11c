use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    collection::{FunctionList, ResourceContainer, add_resource},
    merge::{array_entry, object_entry},
};

/// Plugin identifiers in insertion order, without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct PluginSet(Vec<String>);

impl PluginSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` when the plugin was already present.
    pub fn insert(&mut self, plugin: impl Into<String>) -> bool {
        let plugin = plugin.into();
        if self.contains(&plugin) {
            return false;
        }
        self.0.push(plugin);
        true
    }

    pub fn contains(&self, plugin: &str) -> bool {
        self.0.iter().any(|p| p == plugin)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<String>> for PluginSet {
    fn from(plugins: Vec<String>) -> Self {
        let mut set = Self::new();
        for plugin in plugins {
            set.insert(plugin);
        }
        set
    }
}

impl From<PluginSet> for Vec<String> {
    fn from(set: PluginSet) -> Self {
        set.0
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StepFunctions {
    #[serde(rename = "stateMachines", default)]
    pub state_machines: Map<String, Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// The accumulated service definition threaded through every hook.
///
/// Sections hooks write to are typed; everything else is carried through untouched in `rest`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub framework_version: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub provider: Map<String, Value>,
    #[serde(default, skip_serializing_if = "PluginSet::is_empty")]
    pub plugins: PluginSet,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub package: Map<String, Value>,
    #[serde(default, skip_serializing_if = "FunctionList::is_empty")]
    pub functions: FunctionList,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceContainer>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub custom: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_functions: Option<StepFunctions>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ServiceConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_resource(&mut self, name: impl Into<String>, definition: Value) {
        let container = self.resources.take().unwrap_or_default();
        self.resources = Some(add_resource(container, name, definition));
    }

    pub fn resource(&self, name: &str) -> Option<&Value> {
        self.resources.as_ref()?.get(name)
    }

    pub fn has_resource(&self, name: &str) -> bool {
        self.resource(name).is_some()
    }

    /// `custom.<key>` as an object, created when absent.
    pub fn custom_section_mut(&mut self, key: &str) -> &mut Map<String, Value> {
        object_entry(&mut self.custom, key)
    }

    pub fn custom_section(&self, key: &str) -> Option<&Map<String, Value>> {
        self.custom.get(key)?.as_object()
    }

    /// `provider.environment`, created when absent.
    pub fn provider_environment_mut(&mut self) -> &mut Map<String, Value> {
        object_entry(&mut self.provider, "environment")
    }

    /// `provider.iam.role.statements`, created when absent.
    pub fn iam_statements_mut(&mut self) -> &mut Vec<Value> {
        let iam = object_entry(&mut self.provider, "iam");
        let role = object_entry(iam, "role");
        array_entry(role, "statements")
    }

    pub fn iam_statements(&self) -> &[Value] {
        self.provider
            .get("iam")
            .and_then(|iam| iam.get("role"))
            .and_then(|role| role.get("statements"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn step_functions_mut(&mut self) -> &mut StepFunctions {
        self.step_functions.get_or_insert_with(StepFunctions::default)
    }
}
