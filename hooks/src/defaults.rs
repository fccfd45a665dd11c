//! Default property sets per resource kind. Caller-supplied values always win.

use serde_json::{Map, Value, json};

/// Seconds in a day, for retention periods.
const DAY: u64 = 24 * 60 * 60;

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub fn consumer() -> Map<String, Value> {
    object(json!({
        "timeout": 15,
        "batchSize": 1,
        "maximumBatchingWindow": 10,
    }))
}

pub fn main_queue() -> Map<String, Value> {
    object(json!({
        "maxReceiveCount": 5,
        "receiveMessageWaitTimeSeconds": 20,
        "visibilityTimeout": 60,
        "generateEnvVars": true,
    }))
}

pub fn delay_queue() -> Map<String, Value> {
    let mut defaults = main_queue();
    defaults.insert("delaySeconds".into(), json!(60));
    defaults.insert("generateEnvVars".into(), json!(false));
    defaults
}

pub fn dlq() -> Map<String, Value> {
    object(json!({
        "maxReceiveCount": 5,
        "receiveMessageWaitTimeSeconds": 5,
        "visibilityTimeout": 20,
        "messageRetentionPeriod": 10 * DAY,
        "generateEnvVars": false,
    }))
}

pub fn archive_dlq() -> Map<String, Value> {
    let mut defaults = dlq();
    defaults.insert("messageRetentionPeriod".into(), json!(14 * DAY));
    defaults
}

pub fn provider() -> Map<String, Value> {
    object(json!({
        "name": "aws",
        "runtime": "nodejs20.x",
        "region": "us-east-1",
        "stage": "${opt:stage, 'dev'}",
        "memorySize": 1024,
        "timeout": 6,
        "logRetentionInDays": 30,
        "environment": {
            "STAGE": "${sls:stage}",
            "SERVICE": "${self:service}",
        },
    }))
}

/// Headers API Gateway CORS responses always allow.
pub const CORS_HEADERS: &[&str] = &[
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "X-Amz-Security-Token",
    "X-Amz-User-Agent",
];

pub const AUTHORIZER_IDENTITY_SOURCE: &str = "method.request.header.Authorization";
pub const AUTHORIZER_RESULT_TTL: u64 = 300;
