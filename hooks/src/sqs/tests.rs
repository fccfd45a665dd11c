use serde_json::{Value, json};
use slshooks_service::{BuildContext, HookTuple, HookTupleKind, ValidationError};

use super::*;

fn build(request: Value) -> Vec<HookTuple> {
    build_with(request, &BuildContext::default())
}

fn build_with(request: Value, ctx: &BuildContext) -> Vec<HookTuple> {
    let request: QueueTopologyRequest = serde_json::from_value(request).expect("request");
    build_queue_topology(&request, ctx).expect("topology")
}

fn build_err(request: Value) -> ValidationError {
    let request: QueueTopologyRequest = serde_json::from_value(request).expect("request");
    build_queue_topology(&request, &BuildContext::default()).expect_err("validation error")
}

fn names(tuples: &[HookTuple]) -> Vec<(HookTupleKind, &str)> {
    tuples
        .iter()
        .map(|tuple| (tuple.kind(), tuple.name().unwrap_or("")))
        .collect()
}

fn definition<'a>(tuples: &'a [HookTuple], name: &str) -> &'a Value {
    tuples
        .iter()
        .find(|tuple| tuple.name() == Some(name))
        .and_then(HookTuple::definition)
        .unwrap_or_else(|| panic!("no tuple named {name}"))
}

fn tag<'a>(queue: &'a Value, key: &str) -> Option<&'a Value> {
    queue["Properties"]["Tags"]
        .as_array()?
        .iter()
        .find(|tag| tag["Key"] == key)
        .map(|tag| &tag["Value"])
}

#[test]
fn minimal_request_builds_consumer_queue_and_dlq() {
    let tuples = build(json!({ "name": "test" }));

    assert_eq!(
        names(&tuples),
        [
            (HookTupleKind::Function, "TestQueueConsumer"),
            (HookTupleKind::Resource, "TestQueue"),
            (HookTupleKind::Resource, "TestDLQ"),
        ]
    );

    assert_eq!(
        definition(&tuples, "TestQueueConsumer"),
        &json!({
            "handler": "src/handlers/sqs/testQueueConsumer.handler",
            "timeout": 15,
            "events": [{
                "sqs": {
                    "arn": { "Fn::GetAtt": ["TestQueue", "Arn"] },
                    "batchSize": 1,
                    "maximumBatchingWindow": 10,
                }
            }],
        })
    );

    assert_eq!(
        definition(&tuples, "TestQueue"),
        &json!({
            "Type": "AWS::SQS::Queue",
            "DependsOn": ["TestDLQ"],
            "Properties": {
                "QueueName": "${self:service}-${sls:stage}-TestQueue",
                "ReceiveMessageWaitTimeSeconds": 20,
                "VisibilityTimeout": 60,
                "RedrivePolicy": {
                    "deadLetterTargetArn": { "Fn::GetAtt": ["TestDLQ", "Arn"] },
                    "maxReceiveCount": 5,
                },
                "Tags": [
                    { "Key": "Service", "Value": "${self:service}" },
                    { "Key": "Stage", "Value": "${sls:stage}" },
                    { "Key": "ResourceSet", "Value": "Test" },
                    { "Key": "SQSType", "Value": "Main" },
                    { "Key": "HasConsumer", "Value": "true" },
                ],
            },
        })
    );

    let dlq = definition(&tuples, "TestDLQ");
    assert!(dlq.get("DependsOn").is_none());
    assert!(dlq["Properties"].get("RedrivePolicy").is_none());
    assert_eq!(dlq["Properties"]["MessageRetentionPeriod"], 864000);
    assert_eq!(dlq["Properties"]["ReceiveMessageWaitTimeSeconds"], 5);
    assert_eq!(dlq["Properties"]["VisibilityTimeout"], 20);
    assert_eq!(tag(dlq, "HasConsumer"), Some(&json!("false")));
}

#[test]
fn name_casing_does_not_change_output() {
    assert_eq!(build(json!({ "name": "Test" })), build(json!({ "name": "test" })));
}

#[test]
fn dlq_consumer_adds_archive_queue() {
    let ctx = BuildContext::builder().emit_global_env_vars(true).build();
    let tuples = build_with(
        json!({ "name": "Test", "dlqConsumerProperties": { "batchSize": 10 } }),
        &ctx,
    );

    assert_eq!(
        names(&tuples),
        [
            (HookTupleKind::EnvVars, ""),
            (HookTupleKind::Function, "TestQueueConsumer"),
            (HookTupleKind::Resource, "TestQueue"),
            (HookTupleKind::Resource, "TestDLQ"),
            (HookTupleKind::Function, "TestDLQQueueConsumer"),
            (HookTupleKind::Resource, "TestArchiveDLQ"),
        ]
    );

    let main = definition(&tuples, "TestQueue");
    assert_eq!(
        main["Properties"]["RedrivePolicy"]["deadLetterTargetArn"],
        json!({ "Fn::GetAtt": ["TestDLQ", "Arn"] })
    );

    let dlq = definition(&tuples, "TestDLQ");
    assert_eq!(dlq["DependsOn"], json!(["TestArchiveDLQ"]));
    assert_eq!(
        dlq["Properties"]["RedrivePolicy"]["deadLetterTargetArn"],
        json!({ "Fn::GetAtt": ["TestArchiveDLQ", "Arn"] })
    );
    assert_eq!(tag(dlq, "HasConsumer"), Some(&json!("true")));

    let consumer = definition(&tuples, "TestDLQQueueConsumer");
    assert_eq!(
        consumer["handler"],
        "src/handlers/sqs/testDLQQueueConsumer.handler"
    );
    assert_eq!(consumer["events"][0]["sqs"]["batchSize"], 10);
    assert_eq!(
        consumer["events"][0]["sqs"]["arn"],
        json!({ "Fn::GetAtt": ["TestDLQ", "Arn"] })
    );

    let archive = definition(&tuples, "TestArchiveDLQ");
    assert!(archive.get("DependsOn").is_none());
    assert!(archive["Properties"].get("RedrivePolicy").is_none());
    assert_eq!(archive["Properties"]["MessageRetentionPeriod"], 1209600);
    assert_eq!(tag(archive, "SQSType"), Some(&json!("ArchiveDLQ")));
    assert_eq!(tag(archive, "HasConsumer"), Some(&json!("false")));
}

#[test]
fn env_vars_follow_generate_flags() {
    let ctx = BuildContext::builder().emit_global_env_vars(true).build();
    let tuples = build_with(
        json!({
            "name": "orderCreated",
            "delayQueueProperties": { "generateEnvVars": true },
        }),
        &ctx,
    );

    let HookTuple::EnvVars(env) = &tuples[0] else {
        panic!("expected env vars first, got {:?}", tuples[0]);
    };
    assert_eq!(
        Value::Object(env.clone()),
        json!({
            "ORDER_CREATED_MAIN_QUEUE_URL": { "Ref": "OrderCreatedQueue" },
            "ORDER_CREATED_DELAY_QUEUE_URL": { "Ref": "OrderCreatedDelayQueue" },
        })
    );
}

#[test]
fn env_vars_are_suppressed_by_default() {
    let tuples = build(json!({ "name": "test" }));
    assert!(tuples.iter().all(|tuple| tuple.kind() != HookTupleKind::EnvVars));
}

#[test]
fn env_vars_tuple_is_skipped_when_nothing_generates() {
    let ctx = BuildContext::builder().emit_global_env_vars(true).build();
    let tuples = build_with(
        json!({ "name": "test", "mainQueueProperties": { "generateEnvVars": false } }),
        &ctx,
    );
    assert_eq!(tuples.len(), 3);
    assert_eq!(tuples[0].kind(), HookTupleKind::Function);
}

#[test]
fn use_main_handler_routes_dlq_to_main_consumer() {
    let tuples = build(json!({
        "name": "test",
        "dlqConsumerProperties": { "useMainHandler": true },
    }));

    assert_eq!(
        names(&tuples),
        [
            (HookTupleKind::Function, "TestQueueConsumer"),
            (HookTupleKind::Resource, "TestQueue"),
            (HookTupleKind::Resource, "TestDLQ"),
            (HookTupleKind::Resource, "TestArchiveDLQ"),
        ]
    );

    let events = definition(&tuples, "TestQueueConsumer")["events"]
        .as_array()
        .expect("events");
    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1]["sqs"]["arn"],
        json!({ "Fn::GetAtt": ["TestDLQ", "Arn"] })
    );

    let dlq = definition(&tuples, "TestDLQ");
    assert_eq!(dlq["DependsOn"], json!(["TestArchiveDLQ"]));
    assert_eq!(tag(dlq, "HasConsumer"), Some(&json!("true")));
}

#[test]
fn use_main_handler_false_is_not_a_consumer() {
    let tuples = build(json!({
        "name": "test",
        "dlqConsumerProperties": { "useMainHandler": false },
    }));
    assert_eq!(tuples.len(), 3);
}

#[test]
fn delay_queue_sits_between_main_and_dlq() {
    let tuples = build(json!({
        "name": "test",
        "delayConsumerProperties": { "timeout": 30 },
    }));

    assert_eq!(
        names(&tuples),
        [
            (HookTupleKind::Function, "TestQueueConsumer"),
            (HookTupleKind::Resource, "TestQueue"),
            (HookTupleKind::Function, "TestDelayQueueConsumer"),
            (HookTupleKind::Resource, "TestDelayQueue"),
            (HookTupleKind::Resource, "TestDLQ"),
        ]
    );

    assert_eq!(definition(&tuples, "TestQueue")["DependsOn"], json!(["TestDelayQueue"]));
    let delay = definition(&tuples, "TestDelayQueue");
    assert_eq!(delay["DependsOn"], json!(["TestDLQ"]));
    assert_eq!(delay["Properties"]["DelaySeconds"], 60);
    assert_eq!(tag(delay, "SQSType"), Some(&json!("Delay")));
    assert_eq!(definition(&tuples, "TestDelayQueueConsumer")["timeout"], 30);
}

#[test]
fn delay_queue_without_consumer_still_chains_to_dlq() {
    let tuples = build(json!({
        "name": "test",
        "delayQueueProperties": { "delaySeconds": 120 },
    }));

    assert_eq!(tuples.len(), 4);
    let delay = definition(&tuples, "TestDelayQueue");
    assert_eq!(delay["Properties"]["DelaySeconds"], 120);
    assert_eq!(delay["DependsOn"], json!(["TestDLQ"]));
    assert_eq!(tag(delay, "HasConsumer"), Some(&json!("false")));
}

#[test]
fn delay_and_dlq_main_handler_events_keep_chain_order() {
    let tuples = build(json!({
        "name": "test",
        "delayConsumerProperties": { "useMainHandler": true, "batchSize": 5 },
        "dlqConsumerProperties": { "useMainHandler": true },
    }));

    let events = definition(&tuples, "TestQueueConsumer")["events"]
        .as_array()
        .expect("events");
    let arns: Vec<_> = events.iter().map(|event| &event["sqs"]["arn"]["Fn::GetAtt"][0]).collect();
    assert_eq!(arns, ["TestQueue", "TestDelayQueue", "TestDLQ"]);
    assert_eq!(events[1]["sqs"]["batchSize"], 5);
    assert!(tuples.iter().all(|tuple| tuple.name() != Some("TestDelayQueueConsumer")));
}

#[test]
fn fifo_propagates_to_every_queue_and_topic() {
    let tuples = build(json!({
        "name": "test",
        "mainQueueProperties": { "fifoQueue": true },
        "delayQueueProperties": {},
        "dlqConsumerProperties": { "handler": "src/dlq.handler" },
        "sourceSnsTopic": { "name": "orderCreated" },
    }));

    for queue in ["TestQueue", "TestDelayQueue", "TestDLQ", "TestArchiveDLQ"] {
        let properties = &definition(&tuples, queue)["Properties"];
        assert!(
            properties["QueueName"]
                .as_str()
                .is_some_and(|name| name.ends_with(&format!("{queue}.fifo"))),
            "{queue}: {properties}"
        );
        assert_eq!(properties["FifoQueue"], true);
    }

    let subscription = definition(&tuples, "TestOrderCreatedSubscription");
    assert_eq!(
        subscription["Properties"]["TopicArn"],
        "arn:aws:sns:${aws:region}:${aws:accountId}:${self:service}-${sls:stage}-orderCreated.fifo"
    );
    assert_eq!(definition(&tuples, "TestDLQQueueConsumer")["handler"], "src/dlq.handler");
}

#[test]
fn subscriptions_follow_queue_policy() {
    let tuples = build(json!({
        "name": "test",
        "sourceSnsTopic": [
            { "name": "orderCreated", "filterPolicy": { "type": ["paid"] } },
            { "name": "userDeleted", "scope": "remote", "serviceCode": "users" },
        ],
    }));

    assert_eq!(
        names(&tuples)[3..],
        [
            (HookTupleKind::Resource, "TestQueuePolicy"),
            (HookTupleKind::Resource, "TestOrderCreatedSubscription"),
            (HookTupleKind::Resource, "TestUserDeletedSubscription"),
        ]
    );

    let policy = definition(&tuples, "TestQueuePolicy");
    let statement = &policy["Properties"]["PolicyDocument"]["Statement"][0];
    assert_eq!(statement["Principal"]["Service"], "sns.amazonaws.com");
    assert_eq!(statement["Action"], "sqs:SendMessage");
    assert_eq!(
        statement["Condition"]["ForAnyValue:StringLike"]["aws:SourceOrgPaths"],
        "${self:custom.organizationPath}"
    );

    assert_eq!(
        definition(&tuples, "TestOrderCreatedSubscription"),
        &json!({
            "Type": "AWS::SNS::Subscription",
            "DependsOn": ["TestQueuePolicy"],
            "Properties": {
                "Protocol": "sqs",
                "TopicArn": "arn:aws:sns:${aws:region}:${aws:accountId}:${self:service}-${sls:stage}-orderCreated",
                "Endpoint": { "Fn::GetAtt": ["TestQueue", "Arn"] },
                "RawMessageDelivery": true,
                "FilterPolicy": { "type": ["paid"] },
            },
        })
    );
    assert_eq!(
        definition(&tuples, "TestUserDeletedSubscription")["Properties"]["TopicArn"],
        "arn:aws:sns:${aws:region}:${self:custom.accounts.users}:users-${sls:stage}-userDeleted"
    );
}

#[test]
fn offline_builds_skip_remote_subscriptions_but_keep_policy() {
    let ctx = BuildContext::builder().offline(true).build();
    let tuples = build_with(
        json!({
            "name": "test",
            "sourceSnsTopic": [
                { "name": "orderCreated", "scope": "local" },
                { "name": "userDeleted", "scope": "remote", "serviceCode": "users" },
            ],
        }),
        &ctx,
    );

    assert_eq!(
        names(&tuples)[3..],
        [
            (HookTupleKind::Resource, "TestQueuePolicy"),
            (HookTupleKind::Resource, "TestOrderCreatedSubscription"),
        ]
    );

    let only_remote = build_with(
        json!({
            "name": "test",
            "sourceSnsTopic": { "name": "userDeleted", "scope": "remote", "serviceCode": "users" },
        }),
        &ctx,
    );
    assert_eq!(
        names(&only_remote).last(),
        Some(&(HookTupleKind::Resource, "TestQueuePolicy"))
    );
}

#[test]
fn fast_processing_environment_zeroes_batching_window() {
    let request = json!({
        "name": "test",
        "consumerProperties": { "fastProcessingEnvironments": ["dev"], "batchSize": 3 },
    });

    let fast = build_with(request.clone(), &BuildContext::default());
    let sqs = &definition(&fast, "TestQueueConsumer")["events"][0]["sqs"];
    assert_eq!(sqs["maximumBatchingWindow"], 0);
    assert_eq!(sqs["batchSize"], 3);

    let prod = BuildContext::builder().environment("prod").build();
    let slow = build_with(request, &prod);
    assert_eq!(
        definition(&slow, "TestQueueConsumer")["events"][0]["sqs"]["maximumBatchingWindow"],
        10
    );
}

#[test]
fn tags_and_passthrough_properties() {
    let tuples = build(json!({
        "name": "test",
        "consumerProperties": { "memorySize": 512 },
        "mainQueueProperties": {
            "kmsMasterKeyId": "alias/aws/sqs",
            "addTags": { "Team": "payments", "Stage": "shared", "Critical": true },
        },
    }));

    assert_eq!(definition(&tuples, "TestQueueConsumer")["memorySize"], 512);

    let main = definition(&tuples, "TestQueue");
    assert_eq!(main["Properties"]["KmsMasterKeyId"], "alias/aws/sqs");
    let keys: Vec<_> = main["Properties"]["Tags"]
        .as_array()
        .expect("tags")
        .iter()
        .map(|tag| tag["Key"].as_str().unwrap_or_default())
        .collect();
    assert_eq!(
        keys,
        ["Service", "Stage", "ResourceSet", "SQSType", "HasConsumer", "Team", "Critical"]
    );
    assert_eq!(tag(main, "Stage"), Some(&json!("shared")));
    assert_eq!(tag(main, "Critical"), Some(&json!("true")));
}

#[test]
fn missing_or_blank_name_is_rejected() {
    for request in [json!({}), json!({ "name": "" }), json!({ "name": "  " })] {
        let err = build_err(request);
        assert!(matches!(err, ValidationError::Missing { ref field, .. } if field == "name"));
        assert_eq!(err.hook(), BUILDER);
    }
}

#[test]
fn property_bags_must_be_objects() {
    for field in [
        "consumerProperties",
        "mainQueueProperties",
        "delayConsumerProperties",
        "delayQueueProperties",
        "dlqConsumerProperties",
        "dlqQueueProperties",
        "archiveDLQQueueProperties",
    ] {
        let mut request = json!({ "name": "test" });
        request[field] = json!([1, 2]);
        let err = build_err(request);
        assert!(
            matches!(err, ValidationError::WrongShape { field: ref got, .. } if got == field),
            "{field}: {err}"
        );
    }
}

#[test]
fn fast_processing_environments_must_be_strings() {
    let err = build_err(json!({
        "name": "test",
        "consumerProperties": { "fastProcessingEnvironments": "dev" },
    }));
    assert_eq!(err.field(), Some("consumerProperties.fastProcessingEnvironments"));

    let err = build_err(json!({
        "name": "test",
        "dlqConsumerProperties": { "fastProcessingEnvironments": [1] },
    }));
    assert_eq!(err.field(), Some("dlqConsumerProperties.fastProcessingEnvironments"));
}

#[test]
fn source_topic_validation() {
    let cases = [
        (json!({ "name": 5 }), "sourceSnsTopic.name"),
        (json!({ "name": "a", "filterPolicy": [] }), "sourceSnsTopic.filterPolicy"),
        (json!({ "name": "a", "scope": "global" }), "sourceSnsTopic.scope"),
        (json!({ "name": "a", "serviceCode": "users" }), "sourceSnsTopic.serviceCode"),
        (json!({ "name": "a", "scope": "remote" }), "sourceSnsTopic.serviceCode"),
        (json!({ "name": "a", "scope": "remote", "serviceCode": 7 }), "sourceSnsTopic.serviceCode"),
    ];

    for (topic, field) in cases {
        let err = build_err(json!({ "name": "test", "sourceSnsTopic": topic }));
        assert_eq!(err.field(), Some(field), "{err}");
    }

    let err = build_err(json!({
        "name": "test",
        "sourceSnsTopic": [{ "name": "a" }, { "name": "b", "scope": "nope" }],
    }));
    assert_eq!(err.field(), Some("sourceSnsTopic[1].scope"));
    assert!(err.to_string().contains("sqs topology builder"));
}

#[test]
fn invalid_bag_values_name_the_bag() {
    let err = build_err(json!({
        "name": "test",
        "dlqQueueProperties": { "visibilityTimeout": true },
    }));
    assert!(matches!(err, ValidationError::Constraint { .. }));
    assert_eq!(err.field(), Some("dlqQueueProperties"));
}

#[test]
fn framework_variables_pass_through_numeric_settings() {
    let tuples = build(json!({
        "name": "test",
        "consumerProperties": {
            "batchSize": "${param:batch}",
            "maximumBatchingWindow": "${param:window}",
        },
        "mainQueueProperties": {
            "visibilityTimeout": "${self:custom.visibility}",
            "maxReceiveCount": "${param:receives}",
            "delaySeconds": "${param:delay}",
        },
    }));

    let sqs = &definition(&tuples, "TestQueueConsumer")["events"][0]["sqs"];
    assert_eq!(sqs["batchSize"], "${param:batch}");
    assert_eq!(sqs["maximumBatchingWindow"], "${param:window}");

    let main = &definition(&tuples, "TestQueue")["Properties"];
    assert_eq!(main["VisibilityTimeout"], "${self:custom.visibility}");
    assert_eq!(main["DelaySeconds"], "${param:delay}");
    assert_eq!(main["RedrivePolicy"]["maxReceiveCount"], "${param:receives}");

    let dlq = &definition(&tuples, "TestDLQ")["Properties"];
    assert_eq!(dlq["VisibilityTimeout"], 20);
}
