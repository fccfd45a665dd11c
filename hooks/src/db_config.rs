use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use slshooks_naming::{kebab_case, pascal_case, upper_snake_case};
use slshooks_service::{BuildContext, HookTuple, Result, ServiceConfig};

use crate::{Hook, apply_hook_tuples, validate::require_str};

const HOOK: &str = "dbConfig";

const PASSWORD_LENGTH: u64 = 32;
/// Characters database engines reject in passwords.
const EXCLUDED_PASSWORD_CHARACTERS: &str = "\"@/\\";

/// Database credentials kept in Secrets Manager, with a generated password.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DbConfigParams {
    #[builder(into)]
    pub name: Option<String>,
    #[builder(into)]
    pub username: Option<String>,
    #[builder(into)]
    pub engine: Option<String>,
    pub port: Option<u16>,
    /// Database name; defaults to `name`.
    #[builder(into)]
    pub database: Option<String>,
}

pub struct DbConfigHook;

impl Hook for DbConfigHook {
    type Params = DbConfigParams;

    const NAME: &'static str = HOOK;

    fn apply(
        &self,
        config: ServiceConfig,
        params: &DbConfigParams,
        _ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        let name = require_str(HOOK, "name", params.name.as_deref())?;
        let username = require_str(HOOK, "username", params.username.as_deref())?;
        let engine = require_str(HOOK, "engine", params.engine.as_deref())?;
        let port = params.port.unwrap_or_else(|| default_port(engine));
        let database = params.database.as_deref().unwrap_or(name);

        let secret = format!("{}DbSecret", pascal_case(name));
        let template = json!({
            "username": username,
            "engine": engine,
            "port": port,
            "dbname": database,
        });

        let mut env = Map::new();
        env.insert(
            format!("{}_DB_SECRET_ARN", upper_snake_case(name)),
            json!({ "Ref": secret }),
        );

        let tuples = vec![
            HookTuple::resource(
                secret.clone(),
                json!({
                    "Type": "AWS::SecretsManager::Secret",
                    "Properties": {
                        "Name": format!("${{self:service}}/${{sls:stage}}/{}-db", kebab_case(name)),
                        "GenerateSecretString": {
                            "SecretStringTemplate": template.to_string(),
                            "GenerateStringKey": "password",
                            "PasswordLength": PASSWORD_LENGTH,
                            "ExcludeCharacters": EXCLUDED_PASSWORD_CHARACTERS,
                        },
                    },
                }),
            ),
            HookTuple::EnvVars(env),
            HookTuple::IamStatement(json!({
                "Effect": "Allow",
                "Action": ["secretsmanager:GetSecretValue"],
                "Resource": [{ "Ref": secret }],
            })),
        ];

        Ok(apply_hook_tuples(config, tuples))
    }
}

fn default_port(engine: &str) -> u16 {
    match engine {
        "mysql" | "mariadb" | "aurora-mysql" => 3306,
        "sqlserver" => 1433,
        "oracle" => 1521,
        _ => 5432,
    }
}
