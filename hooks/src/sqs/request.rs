use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use slshooks_service::{Result, ValidationError, merge::with_defaults};

use super::BUILDER;
use crate::{defaults, validate::optional_object};

/// Consumer bag flag: route this queue to the main consumer instead of a dedicated function.
pub(crate) const USE_MAIN_HANDLER: &str = "useMainHandler";

/// Input of the SQS topology builder.
///
/// The property bags stay untyped until validation so a wrong shape is reported against the
/// bag's own field name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct QueueTopologyRequest {
    /// Logical base name; only its first letter is normalized.
    #[builder(into)]
    pub name: Option<String>,
    pub consumer_properties: Option<Value>,
    pub main_queue_properties: Option<Value>,
    pub delay_consumer_properties: Option<Value>,
    pub delay_queue_properties: Option<Value>,
    pub dlq_consumer_properties: Option<Value>,
    pub dlq_queue_properties: Option<Value>,
    #[serde(rename = "archiveDLQQueueProperties")]
    pub archive_dlq_queue_properties: Option<Value>,
    /// One `{name, scope?, serviceCode?, filterPolicy?}` object or a list of them.
    pub source_sns_topic: Option<Value>,
}

/// A numeric setting, or a framework variable (`${param:batch}`) resolved at deploy time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub(crate) enum Quantity {
    Number(u64),
    Variable(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConsumerProps {
    pub handler: Option<String>,
    pub timeout: Quantity,
    pub batch_size: Quantity,
    pub maximum_batching_window: Quantity,
    #[serde(default)]
    pub fast_processing_environments: Vec<String>,
    #[serde(default)]
    pub use_main_handler: bool,
    /// Passed through onto the function definition (`memorySize`, `layers`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueueProps {
    pub max_receive_count: Quantity,
    pub receive_message_wait_time_seconds: Quantity,
    pub visibility_timeout: Quantity,
    #[serde(default)]
    pub message_retention_period: Option<Quantity>,
    #[serde(default)]
    pub delay_seconds: Option<Quantity>,
    #[serde(default)]
    pub fifo_queue: bool,
    #[serde(default)]
    pub content_based_deduplication: Option<bool>,
    #[serde(default)]
    pub generate_env_vars: bool,
    #[serde(default)]
    pub add_tags: Map<String, Value>,
    /// Passed through as queue properties, first letter upper-cased (`kmsMasterKeyId`).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum TopicScope {
    Local,
    Remote,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SourceTopic {
    pub name: String,
    pub scope: TopicScope,
    pub service_code: Option<String>,
    pub filter_policy: Option<Map<String, Value>>,
}

/// The property bags of a request, each checked to be an object.
pub(crate) struct Bags<'a> {
    pub consumer: Option<&'a Map<String, Value>>,
    pub main_queue: Option<&'a Map<String, Value>>,
    pub delay_consumer: Option<&'a Map<String, Value>>,
    pub delay_queue: Option<&'a Map<String, Value>>,
    pub dlq_consumer: Option<&'a Map<String, Value>>,
    pub dlq_queue: Option<&'a Map<String, Value>>,
    pub archive_dlq_queue: Option<&'a Map<String, Value>>,
}

impl QueueTopologyRequest {
    pub(crate) fn validated_name(&self) -> Result<&str> {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => Ok(name.trim()),
            _ => Err(ValidationError::missing(BUILDER, "name")),
        }
    }

    pub(crate) fn bags(&self) -> Result<Bags<'_>> {
        let bags = Bags {
            consumer: optional_object(BUILDER, "consumerProperties", self.consumer_properties.as_ref())?,
            main_queue: optional_object(
                BUILDER,
                "mainQueueProperties",
                self.main_queue_properties.as_ref(),
            )?,
            delay_consumer: optional_object(
                BUILDER,
                "delayConsumerProperties",
                self.delay_consumer_properties.as_ref(),
            )?,
            delay_queue: optional_object(
                BUILDER,
                "delayQueueProperties",
                self.delay_queue_properties.as_ref(),
            )?,
            dlq_consumer: optional_object(
                BUILDER,
                "dlqConsumerProperties",
                self.dlq_consumer_properties.as_ref(),
            )?,
            dlq_queue: optional_object(
                BUILDER,
                "dlqQueueProperties",
                self.dlq_queue_properties.as_ref(),
            )?,
            archive_dlq_queue: optional_object(
                BUILDER,
                "archiveDLQQueueProperties",
                self.archive_dlq_queue_properties.as_ref(),
            )?,
        };

        for (field, bag) in [
            ("consumerProperties", bags.consumer),
            ("delayConsumerProperties", bags.delay_consumer),
            ("dlqConsumerProperties", bags.dlq_consumer),
        ] {
            check_fast_processing_environments(field, bag)?;
        }

        Ok(bags)
    }

    pub(crate) fn source_topics(&self) -> Result<Vec<SourceTopic>> {
        match &self.source_sns_topic {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Object(topic)) => Ok(vec![source_topic("sourceSnsTopic", topic)?]),
            Some(Value::Array(topics)) => topics
                .iter()
                .enumerate()
                .map(|(idx, topic)| {
                    let field = format!("sourceSnsTopic[{idx}]");
                    match topic {
                        Value::Object(topic) => source_topic(&field, topic),
                        _ => Err(ValidationError::wrong_shape(BUILDER, field, "an object")),
                    }
                })
                .collect(),
            Some(_) => Err(ValidationError::wrong_shape(
                BUILDER,
                "sourceSnsTopic",
                "an object or a list of objects",
            )),
        }
    }
}

fn check_fast_processing_environments(
    field: &str,
    bag: Option<&Map<String, Value>>,
) -> Result<()> {
    let Some(environments) = bag.and_then(|bag| bag.get("fastProcessingEnvironments")) else {
        return Ok(());
    };
    let valid = environments
        .as_array()
        .is_some_and(|items| items.iter().all(Value::is_string));
    if !valid {
        return Err(ValidationError::wrong_shape(
            BUILDER,
            format!("{field}.fastProcessingEnvironments"),
            "an array of strings",
        ));
    }
    Ok(())
}

fn source_topic(field: &str, topic: &Map<String, Value>) -> Result<SourceTopic> {
    let name = match topic.get("name") {
        Some(Value::String(name)) if !name.trim().is_empty() => name.trim().to_string(),
        Some(Value::String(_)) => {
            return Err(ValidationError::missing(BUILDER, format!("{field}.name")));
        }
        _ => {
            return Err(ValidationError::wrong_shape(
                BUILDER,
                format!("{field}.name"),
                "a string",
            ));
        }
    };

    let filter_policy = optional_object(
        BUILDER,
        &format!("{field}.filterPolicy"),
        topic.get("filterPolicy"),
    )?
    .cloned();

    let scope = match topic.get("scope") {
        None | Some(Value::Null) => TopicScope::Local,
        Some(Value::String(scope)) if scope == "local" => TopicScope::Local,
        Some(Value::String(scope)) if scope == "remote" => TopicScope::Remote,
        Some(_) => {
            return Err(ValidationError::constraint(
                BUILDER,
                format!("{field}.scope"),
                "must be one of `remote`, `local`",
            ));
        }
    };

    let service_code = match (scope, topic.get("serviceCode")) {
        (TopicScope::Local, None | Some(Value::Null)) => None,
        (TopicScope::Local, Some(_)) => {
            return Err(ValidationError::constraint(
                BUILDER,
                format!("{field}.serviceCode"),
                "is only allowed when `scope` is `remote`",
            ));
        }
        (TopicScope::Remote, Some(Value::String(code))) if !code.trim().is_empty() => {
            Some(code.trim().to_string())
        }
        (TopicScope::Remote, None | Some(Value::Null)) => {
            return Err(ValidationError::missing(
                BUILDER,
                format!("{field}.serviceCode"),
            ));
        }
        (TopicScope::Remote, Some(_)) => {
            return Err(ValidationError::wrong_shape(
                BUILDER,
                format!("{field}.serviceCode"),
                "a non-empty string",
            ));
        }
    };

    Ok(SourceTopic {
        name,
        scope,
        service_code,
        filter_policy,
    })
}

/// Whether a delay/DLQ consumer bag configures a consumer.
///
/// Any property other than `useMainHandler` configures a dedicated consumer;
/// `useMainHandler: true` routes the queue to the main consumer instead.
pub(crate) fn has_consumer(bag: Option<&Map<String, Value>>) -> bool {
    bag.is_some_and(|props| {
        props.get(USE_MAIN_HANDLER) == Some(&Value::Bool(true))
            || props.keys().any(|key| key != USE_MAIN_HANDLER)
    })
}

pub(crate) fn consumer_props(
    field: &str,
    bag: Option<&Map<String, Value>>,
) -> Result<ConsumerProps> {
    parse_with_defaults(field, &defaults::consumer(), bag)
}

pub(crate) fn queue_props(
    field: &str,
    defaults: &Map<String, Value>,
    bag: Option<&Map<String, Value>>,
) -> Result<QueueProps> {
    parse_with_defaults(field, defaults, bag)
}

fn parse_with_defaults<T: DeserializeOwned>(
    field: &str,
    defaults: &Map<String, Value>,
    bag: Option<&Map<String, Value>>,
) -> Result<T> {
    let empty = Map::new();
    let merged = with_defaults(defaults, bag.unwrap_or(&empty));
    serde_json::from_value(Value::Object(merged))
        .map_err(|err| ValidationError::constraint(BUILDER, field, format!("is invalid: {err}")))
}
