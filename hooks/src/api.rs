use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use slshooks_naming::camel_case;
use slshooks_service::{
    BuildContext, Result, ServiceConfig, ValidationError,
    merge::{array_entry, push_unique},
};
use tracing::debug;

use crate::{Hook, validate::require_str};

const HOOK: &str = "api";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Any,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Delete => "delete",
            Self::Head => "head",
            Self::Options => "options",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "get" => Ok(Self::Get),
            "post" => Ok(Self::Post),
            "put" => Ok(Self::Put),
            "patch" => Ok(Self::Patch),
            "delete" => Ok(Self::Delete),
            "head" => Ok(Self::Head),
            "options" => Ok(Self::Options),
            "any" | "*" => Ok(Self::Any),
            _ => Err(ValidationError::constraint(
                HOOK,
                "method",
                format!(
                    "must be one of get, post, put, patch, delete, head, options, any; got `{s}`"
                ),
            )),
        }
    }
}

/// An HTTP endpoint backed by a Lambda function.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ApiParams {
    /// Function name; camel-cased.
    #[builder(into)]
    pub name: Option<String>,
    #[builder(into)]
    pub path: Option<String>,
    #[builder(into)]
    pub method: Option<String>,
    /// Defaults to `src/handlers/api/<name>.handler`.
    #[builder(into)]
    pub handler: Option<String>,
    /// Attach the service CORS settings. Defaults to on when `custom.cors` is configured.
    pub cors: Option<bool>,
    /// Require an API key.
    #[serde(default)]
    #[builder(default)]
    pub private: bool,
    /// Name of an authorizer registered under `custom.authorizers`.
    #[builder(into)]
    pub authorizer: Option<String>,
    /// Extra function properties (`memorySize`, `timeout`, ...).
    pub function_properties: Option<Map<String, Value>>,
}

/// Normalize an HTTP event path.
///
/// Slashes are collapsed and stripped from both ends, and `:param` segments become `{param}`.
/// The root path normalizes to `/`.
pub fn normalize_path(path: &str) -> Result<String> {
    let path = path.trim();
    if path.chars().any(char::is_whitespace) {
        return Err(ValidationError::constraint(
            HOOK,
            "path",
            format!("must not contain whitespace, got `{path}`"),
        ));
    }

    let segments: Vec<String> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| match segment.strip_prefix(':') {
            Some(param) => format!("{{{param}}}"),
            None => segment.to_string(),
        })
        .collect();

    if segments.is_empty() {
        return Ok("/".to_string());
    }
    Ok(segments.join("/"))
}

pub struct ApiHook;

impl Hook for ApiHook {
    type Params = ApiParams;

    const NAME: &'static str = HOOK;

    fn apply(
        &self,
        mut config: ServiceConfig,
        params: &ApiParams,
        _ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        let name = camel_case(require_str(HOOK, "name", params.name.as_deref())?);
        let path = normalize_path(require_str(HOOK, "path", params.path.as_deref())?)?;
        let method = match params.method.as_deref() {
            Some(method) => method.parse()?,
            None => HttpMethod::default(),
        };

        let mut http = Map::new();
        http.insert("path".into(), json!(path));
        http.insert("method".into(), json!(method.as_str()));

        let cors = config.custom.get("cors");
        if params.cors.unwrap_or(cors.is_some()) {
            http.insert("cors".into(), cors.cloned().unwrap_or(Value::Bool(true)));
        }
        if params.private {
            http.insert("private".into(), Value::Bool(true));
        }
        if let Some(authorizer) = &params.authorizer {
            let registered = config
                .custom_section("authorizers")
                .and_then(|authorizers| authorizers.get(authorizer))
                .ok_or_else(|| {
                    ValidationError::constraint(
                        HOOK,
                        "authorizer",
                        format!("references unknown authorizer `{authorizer}`"),
                    )
                })?;
            http.insert("authorizer".into(), registered.clone());
        }
        let event = json!({ "http": http });

        debug!(function = %name, %method, %path, "adding http endpoint");
        match config.functions.get_mut(&name) {
            Some(Value::Object(function)) => {
                push_unique(array_entry(function, "events"), event);
            }
            _ => {
                let mut function = Map::new();
                function.insert(
                    "handler".into(),
                    json!(
                        params
                            .handler
                            .clone()
                            .unwrap_or_else(|| format!("src/handlers/api/{name}.handler"))
                    ),
                );
                if let Some(extra) = &params.function_properties {
                    for (key, value) in extra {
                        function.insert(key.clone(), value.clone());
                    }
                }
                function.insert("events".into(), json!([event]));
                config.functions.upsert(name, Value::Object(function));
            }
        }

        Ok(config)
    }
}
