use slshooks_service::{HookTuple, ServiceConfig, merge::push_unique};
use tracing::debug;

/// Merge builder output into `config`.
///
/// Resources and functions replace same-named entries; env vars are set on
/// `provider.environment`; IAM statements are appended unless an equal statement exists.
/// Re-applying the same tuples leaves the configuration unchanged.
pub fn apply_hook_tuples(
    mut config: ServiceConfig,
    tuples: impl IntoIterator<Item = HookTuple>,
) -> ServiceConfig {
    for tuple in tuples {
        match tuple {
            HookTuple::Resource(resource) => {
                debug!(resource = %resource.name, "adding resource");
                config.add_resource(resource.name, resource.definition);
            }
            HookTuple::Function(function) => {
                debug!(function = %function.name, "adding function");
                config.functions.upsert(function.name, function.definition);
            }
            HookTuple::EnvVars(vars) => {
                let environment = config.provider_environment_mut();
                for (name, value) in vars {
                    environment.insert(name, value);
                }
            }
            HookTuple::IamStatement(statement) => {
                push_unique(config.iam_statements_mut(), statement);
            }
        }
    }
    config
}

#[cfg(test)]
mod tests {
    use serde_json::{Map, json};

    use super::*;

    fn tuples() -> Vec<HookTuple> {
        let mut env = Map::new();
        env.insert("TEST_MAIN_QUEUE_URL".into(), json!({ "Ref": "TestQueue" }));
        vec![
            HookTuple::EnvVars(env),
            HookTuple::function("TestQueueConsumer", json!({ "handler": "h" })),
            HookTuple::resource("TestQueue", json!({ "Type": "AWS::SQS::Queue" })),
            HookTuple::IamStatement(json!({ "Effect": "Allow", "Action": ["sns:Publish"] })),
        ]
    }

    #[test]
    fn applies_every_tuple_kind() {
        let config = apply_hook_tuples(ServiceConfig::new(), tuples());

        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            json!({
                "provider": {
                    "environment": { "TEST_MAIN_QUEUE_URL": { "Ref": "TestQueue" } },
                    "iam": { "role": { "statements": [
                        { "Effect": "Allow", "Action": ["sns:Publish"] }
                    ] } }
                },
                "functions": [{ "TestQueueConsumer": { "handler": "h" } }],
                "resources": { "Resources": { "TestQueue": { "Type": "AWS::SQS::Queue" } } }
            })
        );
    }

    #[test]
    fn reapplying_is_idempotent() {
        let once = apply_hook_tuples(ServiceConfig::new(), tuples());
        let twice = apply_hook_tuples(once.clone(), tuples());
        assert_eq!(once, twice);
    }
}
