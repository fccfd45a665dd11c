use serde_json::{Map, Value};
use slshooks_service::{BuildContext, Result, ServiceConfig, ValidationError};
use tracing::info;

use crate::{
    ApiHook, AuthorizersHook, BaseHook, CorsHook, DbConfigHook, EventListenerHook,
    EventPublisherHook, FunctionUrlHook, FunctionsVpcHook, Hook, StateMachineHook,
};

const REGISTRY: &str = "hook registry";

/// Names `run_hook` accepts, in the order a plan usually applies them.
pub const HOOK_NAMES: &[&str] = &[
    "base",
    "cors",
    "authorizers",
    "api",
    "eventListener",
    "eventPublisher",
    "stateMachine",
    "functionUrl",
    "functionsVpc",
    "dbConfig",
];

/// Apply the hook registered as `name` with untyped `params`.
///
/// Parameters that do not deserialize into the hook's parameter type are reported as
/// [`ValidationError::Malformed`]; an unknown name is a constraint violation.
pub fn run_hook(
    name: &str,
    config: ServiceConfig,
    params: Value,
    ctx: &BuildContext,
) -> Result<ServiceConfig> {
    match name {
        "base" => run(BaseHook, config, params, ctx),
        "cors" => run(CorsHook, config, params, ctx),
        "authorizers" => run(AuthorizersHook, config, params, ctx),
        "api" => run(ApiHook, config, params, ctx),
        "eventListener" => run(EventListenerHook, config, params, ctx),
        "eventPublisher" => run(EventPublisherHook, config, params, ctx),
        "stateMachine" => run(StateMachineHook, config, params, ctx),
        "functionUrl" => run(FunctionUrlHook, config, params, ctx),
        "functionsVpc" => run(FunctionsVpcHook, config, params, ctx),
        "dbConfig" => run(DbConfigHook, config, params, ctx),
        _ => Err(ValidationError::constraint(
            REGISTRY,
            "hook",
            format!(
                "names unknown hook `{name}`; expected one of {}",
                HOOK_NAMES.join(", ")
            ),
        )),
    }
}

fn run<H: Hook>(
    hook: H,
    config: ServiceConfig,
    params: Value,
    ctx: &BuildContext,
) -> Result<ServiceConfig> {
    let params = match params {
        Value::Null => Value::Object(Map::new()),
        params => params,
    };
    let params: H::Params =
        serde_json::from_value(params).map_err(|err| ValidationError::malformed(H::NAME, err))?;

    info!(hook = H::NAME, "applying hook");
    hook.apply(config, &params, ctx)
}
