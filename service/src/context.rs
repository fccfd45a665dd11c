use serde::{Deserialize, Serialize};

/// Execution-context signals consulted while building configuration.
///
/// Passed explicitly into every hook; nothing reads process state, so two builds with different
/// contexts can run side by side.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildContext {
    /// Name of the active environment (stage), matched against `fastProcessingEnvironments`.
    #[builder(into, default = DEFAULT_ENVIRONMENT.to_string())]
    pub environment: String,
    /// Building for a local/offline run; cross-account wiring is skipped.
    #[builder(default)]
    pub offline: bool,
    /// Emit the `envVars` tuple from topology builders.
    #[builder(default)]
    pub emit_global_env_vars: bool,
}

const DEFAULT_ENVIRONMENT: &str = "dev";

impl Default for BuildContext {
    fn default() -> Self {
        Self {
            environment: DEFAULT_ENVIRONMENT.to_string(),
            offline: false,
            emit_global_env_vars: false,
        }
    }
}

impl BuildContext {
    pub fn is_fast_processing(&self, environments: &[String]) -> bool {
        environments.iter().any(|env| *env == self.environment)
    }
}
