use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use serde_with::{OneOrMany, serde_as};
use slshooks_service::{BuildContext, Result, ServiceConfig, ValidationError};

use crate::{Hook, defaults::CORS_HEADERS};

const HOOK: &str = "cors";

const ANY_ORIGIN: &str = "*";

/// Service-wide CORS settings, stored under `custom.cors` and picked up by `api` endpoints.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CorsParams {
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    #[builder(default)]
    pub origins: Vec<String>,
    /// Added to the default header set.
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    #[builder(default)]
    pub headers: Vec<String>,
    pub allow_credentials: Option<bool>,
    pub max_age: Option<u64>,
}

pub struct CorsHook;

impl Hook for CorsHook {
    type Params = CorsParams;

    const NAME: &'static str = HOOK;

    fn apply(
        &self,
        mut config: ServiceConfig,
        params: &CorsParams,
        _ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        let existing = config.custom_section("cors").cloned().unwrap_or_default();

        let mut origins = strings(existing.get("origins"));
        extend_unique(&mut origins, params.origins.iter().cloned());
        if origins.is_empty() {
            origins.push(ANY_ORIGIN.to_string());
        }

        let mut headers: Vec<String> = CORS_HEADERS.iter().map(ToString::to_string).collect();
        extend_unique(&mut headers, strings(existing.get("headers")));
        extend_unique(&mut headers, params.headers.iter().cloned());

        let allow_credentials = params
            .allow_credentials
            .or_else(|| existing.get("allowCredentials").and_then(Value::as_bool))
            .unwrap_or(false);
        if allow_credentials && origins.iter().any(|origin| origin == ANY_ORIGIN) {
            return Err(ValidationError::constraint(
                HOOK,
                "allowCredentials",
                "cannot be combined with the `*` origin",
            ));
        }
        let max_age = params
            .max_age
            .or_else(|| existing.get("maxAge").and_then(Value::as_u64));

        let mut cors = Map::new();
        cors.insert("origins".into(), json!(origins));
        cors.insert("headers".into(), json!(headers));
        cors.insert("allowCredentials".into(), json!(allow_credentials));
        if let Some(max_age) = max_age {
            cors.insert("maxAge".into(), json!(max_age));
        }
        config.custom.insert("cors".into(), Value::Object(cors));

        for (name, response_type) in [
            ("GatewayResponseDefault4XX", "DEFAULT_4XX"),
            ("GatewayResponseDefault5XX", "DEFAULT_5XX"),
        ] {
            config.add_resource(
                name,
                gateway_response(response_type, &origins, &headers, allow_credentials),
            );
        }

        Ok(config)
    }
}

/// Error responses API Gateway produces itself carry the CORS headers too.
fn gateway_response(
    response_type: &str,
    origins: &[String],
    headers: &[String],
    allow_credentials: bool,
) -> Value {
    let origin = match origins {
        [single] => format!("'{single}'"),
        _ => "method.request.header.origin".to_string(),
    };

    let mut parameters = Map::new();
    parameters.insert(
        "gatewayresponse.header.Access-Control-Allow-Origin".into(),
        json!(origin),
    );
    parameters.insert(
        "gatewayresponse.header.Access-Control-Allow-Headers".into(),
        json!(format!("'{}'", headers.join(","))),
    );
    if allow_credentials {
        parameters.insert(
            "gatewayresponse.header.Access-Control-Allow-Credentials".into(),
            json!("'true'"),
        );
    }

    json!({
        "Type": "AWS::ApiGateway::GatewayResponse",
        "Properties": {
            "ResponseParameters": parameters,
            "ResponseType": response_type,
            "RestApiId": { "Ref": "ApiGatewayRestApi" },
        },
    })
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn extend_unique(items: &mut Vec<String>, extra: impl IntoIterator<Item = String>) {
    for item in extra {
        if !items.contains(&item) {
            items.push(item);
        }
    }
}
