use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use serde_with::{OneOrMany, serde_as};
use slshooks_service::{BuildContext, Result, ServiceConfig, ValidationError};

use crate::{Hook, validate::require_non_empty};

const HOOK: &str = "functionsVpc";

/// Place functions in a VPC.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FunctionsVpcParams {
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    #[builder(default)]
    pub security_group_ids: Vec<String>,
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    #[builder(default)]
    pub subnet_ids: Vec<String>,
    /// Functions to attach; every function when absent.
    #[serde_as(as = "Option<OneOrMany<_>>")]
    #[serde(default)]
    pub functions: Option<Vec<String>>,
}

pub struct FunctionsVpcHook;

impl Hook for FunctionsVpcHook {
    type Params = FunctionsVpcParams;

    const NAME: &'static str = HOOK;

    fn apply(
        &self,
        mut config: ServiceConfig,
        params: &FunctionsVpcParams,
        _ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        let security_group_ids =
            require_non_empty(HOOK, "securityGroupIds", &params.security_group_ids)?;
        let subnet_ids = require_non_empty(HOOK, "subnetIds", &params.subnet_ids)?;

        if let Some(functions) = &params.functions {
            if let Some(unknown) = functions.iter().find(|name| !config.functions.contains(name)) {
                return Err(ValidationError::constraint(
                    HOOK,
                    "functions",
                    format!("references unknown function `{unknown}`"),
                ));
            }
        }

        let vpc = json!({
            "securityGroupIds": security_group_ids,
            "subnetIds": subnet_ids,
        });
        for entry in config.functions.iter_mut() {
            let selected = params
                .functions
                .as_ref()
                .is_none_or(|functions| functions.contains(&entry.name));
            if let (true, Value::Object(function)) = (selected, &mut entry.value) {
                function.insert("vpc".into(), vpc.clone());
            }
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServiceConfig {
        serde_json::from_value(json!({
            "functions": [
                { "api": { "handler": "a" } },
                { "worker": { "handler": "w" } },
            ],
        }))
        .unwrap()
    }

    fn apply(params: Value) -> Result<ServiceConfig> {
        let params: FunctionsVpcParams = serde_json::from_value(params).unwrap();
        FunctionsVpcHook.apply(config(), &params, &BuildContext::default())
    }

    #[test]
    fn attaches_vpc_to_every_function() {
        let config = apply(json!({ "securityGroupIds": "sg-1", "subnetIds": ["subnet-1", "subnet-2"] }))
            .unwrap();

        for name in ["api", "worker"] {
            assert_eq!(
                config.functions.get(name).unwrap()["vpc"],
                json!({ "securityGroupIds": ["sg-1"], "subnetIds": ["subnet-1", "subnet-2"] })
            );
        }
    }

    #[test]
    fn attaches_vpc_to_named_functions() {
        let config = apply(json!({
            "securityGroupIds": ["sg-1"],
            "subnetIds": ["subnet-1"],
            "functions": "worker",
        }))
        .unwrap();

        assert!(config.functions.get("api").unwrap().get("vpc").is_none());
        assert!(config.functions.get("worker").unwrap().get("vpc").is_some());
    }

    #[test]
    fn rejects_empty_lists_and_unknown_functions() {
        let err = apply(json!({ "securityGroupIds": [], "subnetIds": ["subnet-1"] })).unwrap_err();
        assert_eq!(err, ValidationError::missing("functionsVpc", "securityGroupIds"));

        let err = apply(json!({ "securityGroupIds": ["sg-1"] })).unwrap_err();
        assert_eq!(err, ValidationError::missing("functionsVpc", "subnetIds"));

        let err = apply(json!({
            "securityGroupIds": ["sg-1"],
            "subnetIds": ["subnet-1"],
            "functions": ["api", "ghost"],
        }))
        .unwrap_err();
        assert!(matches!(err, ValidationError::Constraint { .. }));
        assert!(err.to_string().contains("ghost"));
    }
}
