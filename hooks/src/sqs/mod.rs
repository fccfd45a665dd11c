//! SQS topology builder.
//!
//! One logical queue name expands into a redrive chain:
//!
//! ```text
//! main ──▶ delay? ──▶ DLQ ──▶ archive DLQ?
//! ```
//!
//! The main queue always has a consumer. The delay queue and the DLQ get one when their
//! consumer bag configures it (or routes to the main handler), and only a DLQ with a consumer
//! redrives into an archive queue.

mod request;
#[cfg(test)]
mod tests;

use serde_json::{Map, Value, json};
use slshooks_naming::{lower_first, pascal_case, title_case, upper_first, upper_snake_case};
use slshooks_service::{BuildContext, HookTuple, Result};
use tracing::{debug, warn};

pub use request::QueueTopologyRequest;
use request::{
    ConsumerProps, Quantity, QueueProps, SourceTopic, TopicScope, consumer_props, has_consumer,
    queue_props,
};

use crate::{
    arn::{self, ORGANIZATION_PATH, TopicLocation, physical_name},
    defaults,
    tags::{base_tags, tag_value, tags_to_value, upsert_tag},
};

pub(crate) const BUILDER: &str = "sqs topology builder";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QueueKind {
    Main,
    Delay,
    Dlq,
    ArchiveDlq,
}

impl QueueKind {
    fn logical_suffix(self) -> &'static str {
        match self {
            Self::Main => "Queue",
            Self::Delay => "DelayQueue",
            Self::Dlq => "DLQ",
            Self::ArchiveDlq => "ArchiveDLQ",
        }
    }

    fn tag(self) -> &'static str {
        match self {
            Self::Main => "Main",
            Self::Delay => "Delay",
            Self::Dlq => "DLQ",
            Self::ArchiveDlq => "ArchiveDLQ",
        }
    }

    fn env_segment(self) -> &'static str {
        match self {
            Self::Main => "MAIN",
            Self::Delay => "DELAY",
            Self::Dlq => "DLQ",
            Self::ArchiveDlq => "ARCHIVE_DLQ",
        }
    }
}

/// A queue in the chain with its resolved properties.
struct QueueStage {
    kind: QueueKind,
    queue: QueueProps,
    /// Present iff this queue has a consumer.
    consumer: Option<ConsumerProps>,
}

impl QueueStage {
    fn has_consumer(&self) -> bool {
        self.consumer.is_some()
    }

    /// Consumer events attached to the main consumer rather than a dedicated function.
    fn routes_to_main(&self) -> bool {
        self.consumer
            .as_ref()
            .is_some_and(|consumer| consumer.use_main_handler)
    }
}

/// Validated, fully derived topology, ready to be emitted.
struct QueueTopology {
    title: String,
    fifo: bool,
    main: QueueStage,
    delay: Option<QueueStage>,
    dlq: QueueStage,
    archive: Option<QueueStage>,
    topics: Vec<SourceTopic>,
}

/// Validate `request` and derive its queue topology.
///
/// Tuples come out in declaration order: `envVars` (when the context emits global env vars),
/// main consumer, main queue, delay consumer, delay queue, DLQ, DLQ consumer, archive DLQ,
/// queue policy, then one subscription per source topic.
pub fn build_queue_topology(
    request: &QueueTopologyRequest,
    ctx: &BuildContext,
) -> Result<Vec<HookTuple>> {
    let topology = QueueTopology::from_request(request)?;
    topology.emit(ctx)
}

impl QueueTopology {
    fn from_request(request: &QueueTopologyRequest) -> Result<Self> {
        let title = title_case(request.validated_name()?);
        let bags = request.bags()?;
        let topics = request.source_topics()?;

        let main = QueueStage {
            kind: QueueKind::Main,
            queue: queue_props("mainQueueProperties", &defaults::main_queue(), bags.main_queue)?,
            consumer: Some(consumer_props("consumerProperties", bags.consumer)?),
        };
        let fifo = main.queue.fifo_queue;

        let delay_consumer = if has_consumer(bags.delay_consumer) {
            Some(consumer_props("delayConsumerProperties", bags.delay_consumer)?)
        } else {
            None
        };
        let delay = if bags.delay_queue.is_some() || delay_consumer.is_some() {
            Some(QueueStage {
                kind: QueueKind::Delay,
                queue: queue_props(
                    "delayQueueProperties",
                    &defaults::delay_queue(),
                    bags.delay_queue,
                )?,
                consumer: delay_consumer,
            })
        } else {
            None
        };

        let dlq = QueueStage {
            kind: QueueKind::Dlq,
            queue: queue_props("dlqQueueProperties", &defaults::dlq(), bags.dlq_queue)?,
            consumer: if has_consumer(bags.dlq_consumer) {
                Some(consumer_props("dlqConsumerProperties", bags.dlq_consumer)?)
            } else {
                None
            },
        };

        let archive = if dlq.has_consumer() {
            Some(QueueStage {
                kind: QueueKind::ArchiveDlq,
                queue: queue_props(
                    "archiveDLQQueueProperties",
                    &defaults::archive_dlq(),
                    bags.archive_dlq_queue,
                )?,
                consumer: None,
            })
        } else {
            None
        };

        Ok(Self {
            title,
            fifo,
            main,
            delay,
            dlq,
            archive,
            topics,
        })
    }

    fn queue_name(&self, kind: QueueKind) -> String {
        format!("{}{}", self.title, kind.logical_suffix())
    }

    fn consumer_name(&self, kind: QueueKind) -> String {
        let queue = self.queue_name(kind);
        let stem = queue.strip_suffix("Queue").unwrap_or(&queue);
        format!("{stem}QueueConsumer")
    }

    fn policy_name(&self) -> String {
        format!("{}QueuePolicy", self.title)
    }

    fn stages(&self) -> impl Iterator<Item = &QueueStage> {
        std::iter::once(&self.main)
            .chain(self.delay.as_ref())
            .chain(std::iter::once(&self.dlq))
            .chain(self.archive.as_ref())
    }

    fn emit(&self, ctx: &BuildContext) -> Result<Vec<HookTuple>> {
        let mut tuples = Vec::new();

        if ctx.emit_global_env_vars {
            let env = self.env_vars();
            if !env.is_empty() {
                tuples.push(HookTuple::EnvVars(env));
            }
        }

        let main_extra_events = [self.delay.as_ref(), Some(&self.dlq)]
            .into_iter()
            .flatten()
            .filter(|stage| stage.routes_to_main())
            .filter_map(|stage| {
                let consumer = stage.consumer.as_ref()?;
                Some(self.sqs_event(stage.kind, consumer, ctx))
            })
            .collect::<Vec<_>>();
        tuples.push(self.consumer_function(&self.main, main_extra_events, ctx));

        let first_hop = self.delay.as_ref().unwrap_or(&self.dlq);
        tuples.push(self.queue_resource(&self.main, Some(first_hop.kind)));

        if let Some(delay) = &self.delay {
            if delay.has_consumer() && !delay.routes_to_main() {
                tuples.push(self.consumer_function(delay, Vec::new(), ctx));
            }
            tuples.push(self.queue_resource(delay, Some(QueueKind::Dlq)));
        }

        let dlq_target = self.archive.as_ref().map(|archive| archive.kind);
        tuples.push(self.queue_resource(&self.dlq, dlq_target));
        if self.dlq.has_consumer() && !self.dlq.routes_to_main() {
            tuples.push(self.consumer_function(&self.dlq, Vec::new(), ctx));
        }
        if let Some(archive) = &self.archive {
            tuples.push(self.queue_resource(archive, None));
        }

        if !self.topics.is_empty() {
            tuples.push(self.queue_policy());
            for topic in &self.topics {
                if topic.scope == TopicScope::Remote && ctx.offline {
                    warn!(
                        queue = %self.queue_name(QueueKind::Main),
                        topic = %topic.name,
                        "skipping remote topic subscription while offline"
                    );
                    continue;
                }
                tuples.push(self.subscription(topic)?);
            }
        }

        debug!(
            queue = %self.queue_name(QueueKind::Main),
            tuples = tuples.len(),
            "built queue topology"
        );
        Ok(tuples)
    }

    fn env_vars(&self) -> Map<String, Value> {
        let prefix = upper_snake_case(&self.title);
        self.stages()
            .filter(|stage| stage.kind != QueueKind::ArchiveDlq && stage.queue.generate_env_vars)
            .map(|stage| {
                (
                    format!("{prefix}_{}_QUEUE_URL", stage.kind.env_segment()),
                    json!({ "Ref": self.queue_name(stage.kind) }),
                )
            })
            .collect()
    }

    fn sqs_event(&self, kind: QueueKind, consumer: &ConsumerProps, ctx: &BuildContext) -> Value {
        let batching_window = if ctx.is_fast_processing(&consumer.fast_processing_environments) {
            Quantity::Number(0)
        } else {
            consumer.maximum_batching_window.clone()
        };
        json!({
            "sqs": {
                "arn": { "Fn::GetAtt": [self.queue_name(kind), "Arn"] },
                "batchSize": consumer.batch_size,
                "maximumBatchingWindow": batching_window,
            }
        })
    }

    fn consumer_function(
        &self,
        stage: &QueueStage,
        extra_events: Vec<Value>,
        ctx: &BuildContext,
    ) -> HookTuple {
        let name = self.consumer_name(stage.kind);
        let mut definition = Map::new();
        let mut events = Vec::new();

        if let Some(consumer) = &stage.consumer {
            let handler = consumer
                .handler
                .clone()
                .unwrap_or_else(|| format!("src/handlers/sqs/{}.handler", lower_first(&name)));
            definition.insert("handler".into(), json!(handler));
            definition.insert("timeout".into(), json!(consumer.timeout));
            for (key, value) in &consumer.extra {
                definition.insert(key.clone(), value.clone());
            }
            events.push(self.sqs_event(stage.kind, consumer, ctx));
        }
        events.extend(extra_events);
        definition.insert("events".into(), Value::Array(events));

        HookTuple::function(name, Value::Object(definition))
    }

    fn queue_resource(&self, stage: &QueueStage, redrive_target: Option<QueueKind>) -> HookTuple {
        let name = self.queue_name(stage.kind);
        let props = &stage.queue;
        let mut properties = Map::new();

        properties.insert("QueueName".into(), json!(physical_name(&name, self.fifo)));
        if self.fifo {
            properties.insert("FifoQueue".into(), json!(true));
        }
        if let Some(dedup) = props.content_based_deduplication {
            properties.insert("ContentBasedDeduplication".into(), json!(dedup));
        }
        if let Some(delay) = &props.delay_seconds {
            properties.insert("DelaySeconds".into(), json!(delay));
        }
        if let Some(retention) = &props.message_retention_period {
            properties.insert("MessageRetentionPeriod".into(), json!(retention));
        }
        properties.insert(
            "ReceiveMessageWaitTimeSeconds".into(),
            json!(props.receive_message_wait_time_seconds),
        );
        properties.insert("VisibilityTimeout".into(), json!(props.visibility_timeout));

        let redrive_target = redrive_target.map(|kind| self.queue_name(kind));
        if let Some(target) = &redrive_target {
            properties.insert(
                "RedrivePolicy".into(),
                json!({
                    "deadLetterTargetArn": { "Fn::GetAtt": [target, "Arn"] },
                    "maxReceiveCount": props.max_receive_count,
                }),
            );
        }
        for (key, value) in &props.extra {
            properties.insert(upper_first(key), value.clone());
        }
        properties.insert("Tags".into(), self.tags(stage));

        let mut resource = Map::new();
        resource.insert("Type".into(), json!("AWS::SQS::Queue"));
        if let Some(target) = redrive_target {
            resource.insert("DependsOn".into(), json!([target]));
        }
        resource.insert("Properties".into(), Value::Object(properties));

        HookTuple::resource(name, Value::Object(resource))
    }

    fn tags(&self, stage: &QueueStage) -> Value {
        let mut tags: Vec<(String, Value)> = base_tags();
        tags.push(("ResourceSet".into(), json!(self.title)));
        tags.push(("SQSType".into(), json!(stage.kind.tag())));
        tags.push(("HasConsumer".into(), json!(stage.has_consumer().to_string())));
        for (key, value) in &stage.queue.add_tags {
            upsert_tag(&mut tags, key, tag_value(value));
        }
        tags_to_value(tags)
    }

    fn queue_policy(&self) -> HookTuple {
        let main = self.queue_name(QueueKind::Main);
        HookTuple::resource(
            self.policy_name(),
            json!({
                "Type": "AWS::SQS::QueuePolicy",
                "Properties": {
                    "Queues": [{ "Ref": main }],
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Sid": "AllowOrganizationTopics",
                            "Effect": "Allow",
                            "Principal": { "Service": "sns.amazonaws.com" },
                            "Action": "sqs:SendMessage",
                            "Resource": { "Fn::GetAtt": [main, "Arn"] },
                            "Condition": {
                                "ForAnyValue:StringLike": {
                                    "aws:SourceOrgPaths": ORGANIZATION_PATH,
                                },
                            },
                        }],
                    },
                },
            }),
        )
    }

    fn subscription(&self, topic: &SourceTopic) -> Result<HookTuple> {
        let location = match (&topic.scope, &topic.service_code) {
            (TopicScope::Remote, Some(service_code)) => TopicLocation::Remote { service_code },
            _ => TopicLocation::Local,
        };
        // FIFO queues can only subscribe to FIFO topics.
        let topic_arn = arn::topic_arn(BUILDER, &topic.name, location, self.fifo)?;

        let mut properties = Map::new();
        properties.insert("Protocol".into(), json!("sqs"));
        properties.insert("TopicArn".into(), json!(topic_arn));
        properties.insert(
            "Endpoint".into(),
            json!({ "Fn::GetAtt": [self.queue_name(QueueKind::Main), "Arn"] }),
        );
        properties.insert("RawMessageDelivery".into(), json!(true));
        if let Some(filter_policy) = &topic.filter_policy {
            properties.insert("FilterPolicy".into(), Value::Object(filter_policy.clone()));
        }

        Ok(HookTuple::resource(
            format!("{}{}Subscription", self.title, pascal_case(&topic.name)),
            json!({
                "Type": "AWS::SNS::Subscription",
                "DependsOn": [self.policy_name()],
                "Properties": properties,
            }),
        ))
    }
}
