use miette::{Context as _, IntoDiagnostic as _, Result};
use serde::Deserialize;
use serde_json::Value;
use slshooks_hooks::run_hook;
use slshooks_service::{BuildContext, ServiceConfig};

/// A build plan: a starting configuration and the hooks to thread it through, in order.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Plan {
    #[serde(default)]
    pub context: BuildContext,
    #[serde(default)]
    pub config: ServiceConfig,
    #[serde(default)]
    pub hooks: Vec<HookStep>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HookStep {
    pub hook: String,
    #[serde(default)]
    pub params: Value,
}

impl Plan {
    pub fn parse(source: &str) -> Result<Self> {
        json5::from_str(source)
            .into_diagnostic()
            .wrap_err("invalid plan")
    }

    /// Apply every step to the plan's configuration. The first rejected step aborts the build.
    pub fn run(self, ctx: &BuildContext) -> Result<ServiceConfig> {
        let mut config = self.config;
        for (idx, step) in self.hooks.into_iter().enumerate() {
            config = run_hook(&step.hook, config, step.params, ctx)
                .wrap_err_with(|| format!("step {} (`{}`) failed", idx + 1, step.hook))?;
        }
        Ok(config)
    }
}
