//! Physical names, ARNs and framework-variable references shared by the hooks.

use slshooks_naming::render_template;
use slshooks_service::{Result, ValidationError};

/// Prefix of every physical name this service owns.
pub const SERVICE_STAGE_PREFIX: &str = "${self:service}-${sls:stage}";

/// Organization path that cross-account SNS/SQS permissions are scoped to.
pub const ORGANIZATION_PATH: &str = "${self:custom.organizationPath}";

pub const LOCAL_TOPIC_ARN: &str =
    "arn:aws:sns:${aws:region}:${aws:accountId}:${self:service}-${sls:stage}-{name}{suffix}";
pub const REMOTE_TOPIC_ARN: &str = "arn:aws:sns:${aws:region}:${self:custom.accounts.{serviceCode}}:{serviceCode}-${sls:stage}-{name}{suffix}";
pub const LAMBDA_FUNCTION_ARN: &str =
    "arn:aws:lambda:${aws:region}:${aws:accountId}:function:{service}-${sls:stage}-{function}";
pub const COGNITO_USER_POOL_ARN: &str =
    "arn:aws:cognito-idp:${aws:region}:${aws:accountId}:userpool/{userPoolId}";
pub const STATE_MACHINE_ARN: &str =
    "arn:aws:states:${aws:region}:${aws:accountId}:stateMachine:${self:service}-${sls:stage}-{name}";

const FIFO_SUFFIX: &str = ".fifo";

/// `<service>-<stage>-<logical>`, with the `.fifo` suffix FIFO queues and topics require.
pub fn physical_name(logical: &str, fifo: bool) -> String {
    let suffix = if fifo { FIFO_SUFFIX } else { "" };
    format!("{SERVICE_STAGE_PREFIX}-{logical}{suffix}")
}

/// Where an SNS topic lives relative to this service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TopicLocation<'a> {
    /// Owned by this service.
    Local,
    /// Owned by the service with this code, possibly in another account.
    Remote { service_code: &'a str },
}

pub fn topic_arn(hook: &'static str, name: &str, location: TopicLocation<'_>, fifo_topic: bool) -> Result<String> {
    let suffix = if fifo_topic { FIFO_SUFFIX } else { "" };
    match location {
        TopicLocation::Local => render(
            hook,
            "name",
            LOCAL_TOPIC_ARN,
            &[("name", name), ("suffix", suffix)],
        ),
        TopicLocation::Remote { service_code } => render(
            hook,
            "serviceCode",
            REMOTE_TOPIC_ARN,
            &[("name", name), ("serviceCode", service_code), ("suffix", suffix)],
        ),
    }
}

/// Render `template`, reporting failures against `field` of `hook`.
pub fn render(
    hook: &'static str,
    field: &str,
    template: &str,
    vars: &[(&str, &str)],
) -> Result<String> {
    render_template(template, vars)
        .map_err(|err| ValidationError::constraint(hook, field, err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn physical_names_carry_fifo_suffix() {
        assert_eq!(
            physical_name("TestQueue", false),
            "${self:service}-${sls:stage}-TestQueue"
        );
        assert_eq!(
            physical_name("TestDLQ", true),
            "${self:service}-${sls:stage}-TestDLQ.fifo"
        );
    }

    #[test]
    fn topic_arns() {
        assert_eq!(
            topic_arn("t", "orderCreated", TopicLocation::Local, false).unwrap(),
            "arn:aws:sns:${aws:region}:${aws:accountId}:${self:service}-${sls:stage}-orderCreated"
        );
        assert_eq!(
            topic_arn(
                "t",
                "invoiceIssued",
                TopicLocation::Remote {
                    service_code: "billing"
                },
                true
            )
            .unwrap(),
            "arn:aws:sns:${aws:region}:${self:custom.accounts.billing}:billing-${sls:stage}-invoiceIssued.fifo"
        );
    }

    #[test]
    fn render_reports_the_field() {
        let err = render("authorizers", "authorizers[0].arn", "{nope}", &[]).unwrap_err();
        assert_eq!(err.field(), Some("authorizers[0].arn"));
    }
}
