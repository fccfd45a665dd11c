use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::Error as _,
    ser::SerializeMap as _,
};
use serde_json::{Map, Value};

/// One element of a sequence-shaped collection: a mapping with exactly one key.
#[derive(Clone, Debug, PartialEq)]
pub struct Entry {
    pub name: String,
    pub value: Value,
}

impl Entry {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

impl Serialize for Entry {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, &self.value)?;
        map.end()
    }
}

impl<'de> Deserialize<'de> for Entry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        let len = map.len();
        let mut entries = map.into_iter();
        match (entries.next(), entries.next()) {
            (Some((name, value)), None) => Ok(Self { name, value }),
            _ => Err(D::Error::custom(format!(
                "expected a mapping with exactly one key, found {len} keys"
            ))),
        }
    }
}

/// The `resources.Resources` section.
///
/// Service definitions write it either as one mapping or as a list of single-key mappings
/// (typically one per included file). Both shapes mean the same thing and each is written back
/// in the shape it was read in.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceCollection {
    Sequence(Vec<Entry>),
    Mapping(Map<String, Value>),
}

impl Default for ResourceCollection {
    fn default() -> Self {
        Self::Mapping(Map::new())
    }
}

impl ResourceCollection {
    /// Insert `definition` under `name`, replacing an existing definition in place.
    pub fn upsert(&mut self, name: impl Into<String>, definition: Value) {
        let name = name.into();
        match self {
            Self::Mapping(map) => {
                map.insert(name, definition);
            }
            Self::Sequence(entries) => {
                match entries.iter_mut().find(|entry| entry.name == name) {
                    Some(entry) => entry.value = definition,
                    None => entries.push(Entry::new(name, definition)),
                }
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Self::Mapping(map) => map.get(name),
            Self::Sequence(entries) => entries
                .iter()
                .find(|entry| entry.name == name)
                .map(|entry| &entry.value),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Mapping(map) => map.len(),
            Self::Sequence(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Mapping(map) => map.keys().map(String::as_str).collect(),
            Self::Sequence(entries) => entries.iter().map(|entry| entry.name.as_str()).collect(),
        }
    }
}

/// The `resources` block: `Resources` plus pass-through siblings such as `Outputs`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceContainer {
    #[serde(
        rename = "Resources",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub resources: Option<ResourceCollection>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl ResourceContainer {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.resources.as_ref()?.get(name)
    }
}

/// Insert or replace the resource `name` in `container`.
///
/// A missing `Resources` section is created as a mapping; an existing one keeps its shape.
pub fn add_resource(
    mut container: ResourceContainer,
    name: impl Into<String>,
    definition: Value,
) -> ResourceContainer {
    container
        .resources
        .get_or_insert_with(ResourceCollection::default)
        .upsert(name, definition);
    container
}

/// The `functions` section: an ordered list of single-key mappings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionList(Vec<Entry>);

impl FunctionList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, name: impl Into<String>, definition: Value) {
        let name = name.into();
        match self.0.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.value = definition,
            None => self.0.push(Entry::new(name, definition)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Value> {
        self.0
            .iter_mut()
            .find(|entry| entry.name == name)
            .map(|entry| &mut entry.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|entry| entry.name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Entry> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
