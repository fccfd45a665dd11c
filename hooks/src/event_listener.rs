use serde_json::Value;
use slshooks_service::{BuildContext, HookTuple, Result, ServiceConfig};

use crate::{
    Hook, apply_hook_tuples,
    sns::{TopicTopologyRequest, build_topic_topology, topic_env_var},
    sqs::{QueueTopologyRequest, build_queue_topology},
};

/// Queue topology with its consumers, optionally subscribed to SNS topics.
pub struct EventListenerHook;

impl Hook for EventListenerHook {
    type Params = QueueTopologyRequest;

    const NAME: &'static str = "eventListener";

    fn apply(
        &self,
        config: ServiceConfig,
        params: &QueueTopologyRequest,
        ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        let tuples = build_queue_topology(params, ctx)?;
        Ok(apply_hook_tuples(config, tuples))
    }
}

/// SNS topic this service publishes to, with its ARN exposed as an env var.
pub struct EventPublisherHook;

impl Hook for EventPublisherHook {
    type Params = TopicTopologyRequest;

    const NAME: &'static str = "eventPublisher";

    fn apply(
        &self,
        config: ServiceConfig,
        params: &TopicTopologyRequest,
        _ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        let mut tuples = build_topic_topology(params)?;

        // Validated by the builder above.
        if let Some(name) = params
            .topic
            .as_ref()
            .and_then(|topic| topic.get("name"))
            .and_then(Value::as_str)
        {
            let (key, value) = topic_env_var(name);
            tuples.push(HookTuple::EnvVars([(key, value)].into_iter().collect()));
        }

        Ok(apply_hook_tuples(config, tuples))
    }
}
