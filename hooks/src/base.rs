use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use serde_with::{OneOrMany, serde_as};
use slshooks_service::{
    BuildContext, Result, ServiceConfig,
    merge::{merge_defaults, object_entry},
};

use crate::{Hook, defaults, validate::require_str};

const FRAMEWORK_VERSION: &str = "3";

/// Service skeleton: name, provider defaults, packaging and plugins.
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BaseParams {
    #[builder(into)]
    pub service: Option<String>,
    #[builder(into)]
    pub runtime: Option<String>,
    #[builder(into)]
    pub region: Option<String>,
    #[builder(into)]
    pub stage: Option<String>,
    pub memory_size: Option<u64>,
    pub timeout: Option<u64>,
    /// Merged into `provider.tags`.
    #[serde(default)]
    #[builder(default)]
    pub tags: Map<String, Value>,
    #[serde_as(as = "OneOrMany<_>")]
    #[serde(default)]
    #[builder(default)]
    pub plugins: Vec<String>,
    /// Organization path SNS/SQS cross-account permissions are scoped to.
    #[builder(into)]
    pub organization_path: Option<String>,
    /// Service code to AWS account id, for remote topic ARNs.
    #[serde(default)]
    #[builder(default)]
    pub accounts: Map<String, Value>,
}

pub struct BaseHook;

impl Hook for BaseHook {
    type Params = BaseParams;

    const NAME: &'static str = "base";

    fn apply(
        &self,
        mut config: ServiceConfig,
        params: &BaseParams,
        _ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        let service = require_str(Self::NAME, "service", params.service.as_deref())?;

        config.service = Some(service.to_string());
        config.framework_version = Some(FRAMEWORK_VERSION.to_string());

        let explicit = [
            ("runtime", params.runtime.as_ref().map(|runtime| json!(runtime))),
            ("region", params.region.as_ref().map(|region| json!(region))),
            ("stage", params.stage.as_ref().map(|stage| json!(stage))),
            ("memorySize", params.memory_size.map(|size| json!(size))),
            ("timeout", params.timeout.map(|timeout| json!(timeout))),
        ];
        for (key, value) in explicit {
            if let Some(value) = value {
                config.provider.insert(key.to_string(), value);
            }
        }
        merge_defaults(&mut config.provider, &defaults::provider());

        if !params.tags.is_empty() {
            let tags = object_entry(&mut config.provider, "tags");
            for (key, value) in &params.tags {
                tags.insert(key.clone(), value.clone());
            }
        }

        config
            .package
            .entry("individually")
            .or_insert(Value::Bool(true));

        for plugin in &params.plugins {
            config.plugins.insert(plugin.as_str());
        }

        if let Some(path) = &params.organization_path {
            config
                .custom
                .insert("organizationPath".into(), json!(path));
        }
        if !params.accounts.is_empty() {
            let accounts = config.custom_section_mut("accounts");
            for (code, account) in &params.accounts {
                accounts.insert(code.clone(), account.clone());
            }
        }

        Ok(config)
    }
}
