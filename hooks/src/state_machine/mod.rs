//! Step Functions state machines.
//!
//! Every `Task` state gets the executing state machine's name and its own state name as
//! parameters, so handlers can log and route on them without extra configuration.


use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use slshooks_naming::{camel_case, pascal_case, upper_snake_case};
use slshooks_service::{BuildContext, Result, ServiceConfig, ValidationError};
use tracing::debug;

use crate::{
    Hook,
    arn::{self, STATE_MACHINE_ARN, physical_name},
    validate::{optional_object, require_str},
};

const HOOK: &str = "stateMachine";

const STEP_FUNCTIONS_PLUGIN: &str = "serverless-step-functions";

/// Tasks with this resource start another execution, which receives its own context.
const START_EXECUTION: &str = "arn:aws:states:::states:startExecution";

const CONTEXT_PARAMETERS: [(&str, &str); 2] = [
    ("stateMachine.$", "$$.StateMachine.Name"),
    ("state.$", "$$.State.Name"),
];

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StateMachineParams {
    #[builder(into)]
    pub name: Option<String>,
    /// Amazon States Language definition; must contain `States`.
    pub definition: Option<Value>,
    /// Triggers (`schedule`, `http`, ...) passed through to the plugin.
    pub events: Option<Vec<Value>>,
}

pub struct StateMachineHook;

impl Hook for StateMachineHook {
    type Params = StateMachineParams;

    const NAME: &'static str = HOOK;

    fn apply(
        &self,
        mut config: ServiceConfig,
        params: &StateMachineParams,
        _ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        let name = require_str(HOOK, "name", params.name.as_deref())?;
        let definition = optional_object(HOOK, "definition", params.definition.as_ref())?
            .ok_or_else(|| ValidationError::missing(HOOK, "definition"))?;
        if !definition.get("States").is_some_and(Value::is_object) {
            return Err(ValidationError::wrong_shape(
                HOOK,
                "definition.States",
                "an object of states",
            ));
        }

        let pascal = pascal_case(name);
        let id = format!("{pascal}StateMachine");

        let mut definition = Value::Object(definition.clone());
        inject_context_parameters(&mut definition);

        let mut machine = Map::new();
        machine.insert("name".into(), json!(physical_name(&pascal, false)));
        machine.insert("id".into(), json!(id));
        machine.insert("definition".into(), definition);
        if let Some(events) = &params.events {
            machine.insert("events".into(), json!(events));
        }

        debug!(state_machine = %id, "registering state machine");
        config
            .step_functions_mut()
            .state_machines
            .insert(camel_case(name), Value::Object(machine));
        config.plugins.insert(STEP_FUNCTIONS_PLUGIN);

        let arn = arn::render(HOOK, "name", STATE_MACHINE_ARN, &[("name", pascal.as_str())])?;
        config
            .custom_section_mut("stateMachines")
            .insert(name.to_string(), json!({ "arn": arn, "id": id }));
        config.provider_environment_mut().insert(
            format!("{}_STATE_MACHINE_ARN", upper_snake_case(name)),
            json!({ "Ref": id }),
        );

        Ok(config)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum StateKind {
    Task,
    Map,
    Parallel,
    Other,
}

impl StateKind {
    fn of(state: &Map<String, Value>) -> Self {
        match state.get("Type").and_then(Value::as_str) {
            Some("Task") => Self::Task,
            Some("Map") => Self::Map,
            Some("Parallel") => Self::Parallel,
            _ => Self::Other,
        }
    }
}

/// Add `stateMachine.$` and `state.$` to the parameters of every `Task` in `definition`,
/// descending into `Map` processors and `Parallel` branches.
///
/// Tasks starting a nested execution are left alone, as are tasks a `Parallel` state
/// continues into.
pub fn inject_context_parameters(definition: &mut Value) {
    if let Some(states) = definition.get_mut("States").and_then(Value::as_object_mut) {
        inject_states(states);
    }
}

fn inject_states(states: &mut Map<String, Value>) {
    let parallel_targets: HashSet<String> = states
        .values()
        .filter_map(Value::as_object)
        .filter(|state| StateKind::of(state) == StateKind::Parallel)
        .filter_map(|state| state.get("Next").and_then(Value::as_str))
        .map(str::to_string)
        .collect();

    for (name, state) in states.iter_mut() {
        let Some(state) = state.as_object_mut() else {
            continue;
        };
        match StateKind::of(state) {
            StateKind::Task => {
                let nested_execution =
                    state.get("Resource").and_then(Value::as_str) == Some(START_EXECUTION);
                if !nested_execution && !parallel_targets.contains(name) {
                    inject_task(state);
                }
            }
            StateKind::Map => {
                for key in ["ItemProcessor", "Iterator"] {
                    if let Some(processor) = state.get_mut(key) {
                        inject_context_parameters(processor);
                    }
                }
            }
            StateKind::Parallel => {
                if let Some(branches) = state.get_mut("Branches").and_then(Value::as_array_mut) {
                    branches.iter_mut().for_each(inject_context_parameters);
                }
            }
            StateKind::Other => {}
        }
    }
}

/// Where a task's parameters receive the context values.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Site {
    /// `Parameters.Payload` (Lambda invoke).
    Payload,
    /// `Parameters.Input` (nested workflows, SQS-style integrations).
    Input,
    /// `Parameters.Target.Input` (EventBridge Scheduler).
    TargetInput,
    Parameters,
    /// No parameters; pass the state input through alongside the context values.
    Synthesized,
}

fn injection_site(state: &Map<String, Value>) -> Site {
    let Some(parameters) = state.get("Parameters").and_then(Value::as_object) else {
        return Site::Synthesized;
    };
    let is_object = |value: Option<&Value>| value.is_some_and(Value::is_object);

    if is_object(parameters.get("Payload")) {
        Site::Payload
    } else if is_object(parameters.get("Input")) {
        Site::Input
    } else if is_object(parameters.get("Target").and_then(|target| target.get("Input"))) {
        Site::TargetInput
    } else {
        Site::Parameters
    }
}

fn inject_task(state: &mut Map<String, Value>) {
    let site = injection_site(state);
    if site == Site::Synthesized {
        state.insert("Parameters".into(), json!({ "input.$": "$" }));
    }

    let parameters = state.get_mut("Parameters");
    let target = match site {
        Site::Payload => parameters.and_then(|p| p.get_mut("Payload")),
        Site::Input => parameters.and_then(|p| p.get_mut("Input")),
        Site::TargetInput => parameters
            .and_then(|p| p.get_mut("Target"))
            .and_then(|target| target.get_mut("Input")),
        Site::Parameters | Site::Synthesized => parameters,
    };

    if let Some(target) = target.and_then(Value::as_object_mut) {
        for (key, value) in CONTEXT_PARAMETERS {
            target.insert(key.into(), json!(value));
        }
    }
}
