use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_with::{OneOrMany, serde_as};
use slshooks_service::{BuildContext, Result, ServiceConfig, ValidationError};
use tracing::debug;

use crate::{
    Hook,
    arn::{self, COGNITO_USER_POOL_ARN, LAMBDA_FUNCTION_ARN},
    defaults::{AUTHORIZER_IDENTITY_SOURCE, AUTHORIZER_RESULT_TTL},
    validate::require_str,
};

const HOOK: &str = "authorizers";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorizerKind {
    /// Lambda authorizer reading a bearer token.
    #[default]
    Token,
    /// Lambda authorizer receiving the whole request.
    Request,
    Cognito,
}

impl AuthorizerKind {
    /// The API Gateway authorizer type.
    fn gateway_type(self) -> &'static str {
        match self {
            Self::Token => "TOKEN",
            Self::Request => "REQUEST",
            Self::Cognito => "COGNITO_USER_POOLS",
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AuthorizerParams {
    #[builder(into)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    #[builder(default)]
    pub kind: AuthorizerKind,
    /// Service owning the authorizer function. Defaults to this service.
    #[builder(into)]
    pub service: Option<String>,
    #[builder(into)]
    pub function_name: Option<String>,
    #[builder(into)]
    pub user_pool_id: Option<String>,
    /// Explicit ARN; skips deriving one from the function or user pool.
    #[builder(into)]
    pub arn: Option<String>,
    #[builder(into)]
    pub identity_source: Option<String>,
    pub result_ttl_in_seconds: Option<u64>,
}

#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(deny_unknown_fields)]
pub struct AuthorizersParams {
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    #[builder(default)]
    pub authorizers: Vec<AuthorizerParams>,
}

/// Registers API Gateway authorizers under `custom.authorizers` for `api` endpoints to reference.
pub struct AuthorizersHook;

impl Hook for AuthorizersHook {
    type Params = AuthorizersParams;

    const NAME: &'static str = HOOK;

    fn apply(
        &self,
        mut config: ServiceConfig,
        params: &AuthorizersParams,
        _ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        if params.authorizers.is_empty() {
            return Err(ValidationError::missing(HOOK, "authorizers"));
        }

        let mut seen = HashSet::new();
        let mut registered = Vec::with_capacity(params.authorizers.len());
        for (idx, authorizer) in params.authorizers.iter().enumerate() {
            let field = |name: &str| format!("authorizers[{idx}].{name}");

            let name = require_str(HOOK, &field("name"), authorizer.name.as_deref())?;
            if !seen.insert(name) {
                return Err(ValidationError::constraint(
                    HOOK,
                    field("name"),
                    format!("declares `{name}` more than once"),
                ));
            }

            let arn = match (&authorizer.arn, authorizer.kind) {
                (Some(arn), _) => arn.clone(),
                (None, AuthorizerKind::Token | AuthorizerKind::Request) => {
                    let function = require_str(
                        HOOK,
                        &field("functionName"),
                        authorizer.function_name.as_deref(),
                    )?;
                    let service = authorizer.service.as_deref().unwrap_or("${self:service}");
                    arn::render(
                        HOOK,
                        &field("functionName"),
                        LAMBDA_FUNCTION_ARN,
                        &[("service", service), ("function", function)],
                    )?
                }
                (None, AuthorizerKind::Cognito) => {
                    let pool = require_str(
                        HOOK,
                        &field("userPoolId"),
                        authorizer.user_pool_id.as_deref(),
                    )?;
                    arn::render(
                        HOOK,
                        &field("userPoolId"),
                        COGNITO_USER_POOL_ARN,
                        &[("userPoolId", pool)],
                    )?
                }
            };

            registered.push((
                name.to_string(),
                json!({
                    "name": name,
                    "arn": arn,
                    "type": authorizer.kind.gateway_type(),
                    "identitySource": authorizer
                        .identity_source
                        .as_deref()
                        .unwrap_or(AUTHORIZER_IDENTITY_SOURCE),
                    "resultTtlInSeconds": authorizer
                        .result_ttl_in_seconds
                        .unwrap_or(AUTHORIZER_RESULT_TTL),
                }),
            ));
        }

        let section = config.custom_section_mut("authorizers");
        for (name, authorizer) in registered {
            debug!(authorizer = %name, "registering authorizer");
            section.insert(name, authorizer);
        }
        Ok(config)
    }
}
