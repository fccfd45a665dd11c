//! SNS topic builder.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use slshooks_naming::{pascal_case, upper_first, upper_snake_case};
use slshooks_service::{HookTuple, Result, ValidationError};

use crate::{
    arn::{ORGANIZATION_PATH, physical_name},
    tags::{base_tags, tag_value, tags_to_value, upsert_tag},
};

const BUILDER: &str = "sns topic builder";

const MAX_TOPIC_NAME_LEN: usize = 256;

/// Actions the owning account keeps on its topics.
const OWNER_ACTIONS: &[&str] = &[
    "SNS:GetTopicAttributes",
    "SNS:SetTopicAttributes",
    "SNS:AddPermission",
    "SNS:RemovePermission",
    "SNS:DeleteTopic",
    "SNS:Subscribe",
    "SNS:ListSubscriptionsByTopic",
    "SNS:Publish",
];

/// Input of the SNS topic builder: `{ topic: { name, fifoTopic?, displayName?, addTags?, .. } }`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct TopicTopologyRequest {
    pub topic: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TopicProps {
    name: String,
    #[serde(default)]
    fifo_topic: bool,
    #[serde(default)]
    content_based_deduplication: Option<bool>,
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    add_tags: Map<String, Value>,
    /// Passed through as topic properties, first letter upper-cased.
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Build `[topic, publish statement, topic policy]` for `request.topic`.
pub fn build_topic_topology(request: &TopicTopologyRequest) -> Result<Vec<HookTuple>> {
    let topic = match &request.topic {
        None | Some(Value::Null) => return Err(ValidationError::missing(BUILDER, "topic")),
        Some(Value::Object(topic)) => topic,
        Some(_) => return Err(ValidationError::wrong_shape(BUILDER, "topic", "an object")),
    };
    validate_topic_name(topic.get("name"))?;

    let props: TopicProps = serde_json::from_value(Value::Object(topic.clone()))
        .map_err(|err| ValidationError::constraint(BUILDER, "topic", format!("is invalid: {err}")))?;

    let logical = topic_logical_name(&props.name);
    let topic_ref = json!({ "Ref": logical });

    let mut properties = Map::new();
    properties.insert(
        "TopicName".into(),
        json!(physical_name(&props.name, props.fifo_topic)),
    );
    if props.fifo_topic {
        properties.insert("FifoTopic".into(), json!(true));
    }
    if let Some(dedup) = props.content_based_deduplication {
        properties.insert("ContentBasedDeduplication".into(), json!(dedup));
    }
    if let Some(display_name) = &props.display_name {
        properties.insert("DisplayName".into(), json!(display_name));
    }
    for (key, value) in &props.extra {
        properties.insert(upper_first(key), value.clone());
    }
    let mut tags = base_tags();
    tags.push(("ResourceSet".into(), json!(pascal_case(&props.name))));
    for (key, value) in &props.add_tags {
        upsert_tag(&mut tags, key, tag_value(value));
    }
    properties.insert("Tags".into(), tags_to_value(tags));

    let topic_resource = HookTuple::resource(
        logical.clone(),
        json!({ "Type": "AWS::SNS::Topic", "Properties": properties }),
    );

    let publish = HookTuple::IamStatement(json!({
        "Effect": "Allow",
        "Action": ["sns:Publish"],
        "Resource": [topic_ref],
    }));

    let policy = HookTuple::resource(
        format!("{logical}Policy"),
        json!({
            "Type": "AWS::SNS::TopicPolicy",
            "Properties": {
                "Topics": [topic_ref],
                "PolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [
                        {
                            "Sid": "OwnerAdministration",
                            "Effect": "Allow",
                            "Principal": { "AWS": "*" },
                            "Action": OWNER_ACTIONS,
                            "Resource": topic_ref,
                            "Condition": {
                                "StringEquals": {
                                    "AWS:SourceOwner": { "Ref": "AWS::AccountId" },
                                },
                            },
                        },
                        {
                            "Sid": "OrganizationSubscribe",
                            "Effect": "Allow",
                            "Principal": { "AWS": "*" },
                            "Action": "SNS:Subscribe",
                            "Resource": topic_ref,
                            "Condition": {
                                "ForAnyValue:StringLike": {
                                    "aws:PrincipalOrgPaths": ORGANIZATION_PATH,
                                },
                            },
                        },
                    ],
                },
            },
        }),
    );

    Ok(vec![topic_resource, publish, policy])
}

/// `<UPPER_SNAKE(name)>_TOPIC_ARN`, referencing the topic built for `name`.
pub fn topic_env_var(name: &str) -> (String, Value) {
    (
        format!("{}_TOPIC_ARN", upper_snake_case(name)),
        json!({ "Ref": topic_logical_name(name) }),
    )
}

fn topic_logical_name(name: &str) -> String {
    format!("{}Topic", pascal_case(name))
}

fn validate_topic_name(name: Option<&Value>) -> Result<()> {
    let name = match name {
        None | Some(Value::Null) => return Err(ValidationError::missing(BUILDER, "topic.name")),
        Some(Value::String(name)) => name,
        Some(_) => {
            return Err(ValidationError::wrong_shape(BUILDER, "topic.name", "a string"));
        }
    };

    let len = name.chars().count();
    if len == 0 || len > MAX_TOPIC_NAME_LEN {
        return Err(ValidationError::constraint(
            BUILDER,
            "topic.name",
            format!("must be between 1 and {MAX_TOPIC_NAME_LEN} characters long, got {len}"),
        ));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-')
    {
        return Err(ValidationError::constraint(
            BUILDER,
            "topic.name",
            format!("must match ^[0-9a-z_-]+$ (case-insensitive), got `{name}`"),
        ));
    }
    Ok(())
}
