#![forbid(unsafe_code)]

use serde::de::DeserializeOwned;
use slshooks_service::{BuildContext, Result, ServiceConfig};

mod api;
mod apply;
pub mod arn;
mod authorizers;
mod base;
mod cors;
mod db_config;
pub mod defaults;
mod event_listener;
mod function_url;
mod functions_vpc;
mod registry;
mod sns;
mod sqs;
mod state_machine;
mod tags;
mod validate;

pub use api::{ApiHook, ApiParams, HttpMethod, normalize_path};
pub use apply::apply_hook_tuples;
pub use authorizers::{AuthorizerKind, AuthorizerParams, AuthorizersHook, AuthorizersParams};
pub use base::{BaseHook, BaseParams};
pub use cors::{CorsHook, CorsParams};
pub use db_config::{DbConfigHook, DbConfigParams};
pub use event_listener::{EventListenerHook, EventPublisherHook};
pub use function_url::{FunctionUrlHook, FunctionUrlParams};
pub use functions_vpc::{FunctionsVpcHook, FunctionsVpcParams};
pub use registry::{HOOK_NAMES, run_hook};
pub use sns::{TopicTopologyRequest, build_topic_topology, topic_env_var};
pub use sqs::{QueueTopologyRequest, build_queue_topology};
pub use state_machine::{StateMachineHook, StateMachineParams, inject_context_parameters};

/// A configuration transform composed by the build pipeline.
///
/// `apply` consumes the accumulated configuration and returns the configuration with this
/// hook's contribution merged in. A rejected call returns an error and contributes nothing.
pub trait Hook {
    type Params: DeserializeOwned;

    /// Name the hook is registered under.
    const NAME: &'static str;

    fn apply(
        &self,
        config: ServiceConfig,
        params: &Self::Params,
        ctx: &BuildContext,
    ) -> Result<ServiceConfig>;
}
