use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use slshooks_naming::{function_logical_id, kebab_case, pascal_case};
use slshooks_service::{
    BuildContext, Result, ServiceConfig, ValidationError,
    merge::{array_entry, object_entry},
};
use tracing::debug;

use crate::{
    Hook,
    validate::{require_str, section_str},
};

const HOOK: &str = "functionUrl";

/// AWS managed `CachingDisabled` policy.
const CACHE_POLICY_ID: &str = "4135ea2d-6df8-44a3-9df3-4b5a84be39ad";
/// AWS managed `AllViewerExceptHostHeader` policy.
const ORIGIN_REQUEST_POLICY_ID: &str = "b689b0a8-53d0-40ab-baf2-68738e2966ac";
/// Hosted zone of every CloudFront distribution.
const CLOUDFRONT_HOSTED_ZONE_ID: &str = "Z2FDTNDATAQYW2";

const ALLOWED_METHODS: &[&str] = &["GET", "HEAD", "OPTIONS", "PUT", "PATCH", "POST", "DELETE"];
const CACHED_METHODS: &[&str] = &["GET", "HEAD"];

/// Serve a function URL through CloudFront on `<subdomain>.<domain>`.
///
/// Several functions may share a subdomain: each becomes an origin of the same distribution
/// behind its own path pattern.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, bon::Builder)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FunctionUrlParams {
    #[builder(into)]
    pub function_name: Option<String>,
    #[builder(into)]
    pub subdomain: Option<String>,
    /// Defaults to `custom.domain`.
    #[builder(into)]
    pub domain: Option<String>,
    /// Defaults to `custom.certificateArn`. Only needed when the distribution is created.
    #[builder(into)]
    pub certificate_arn: Option<String>,
    /// Defaults to `custom.hostedZoneName`, then `<domain>.`.
    #[builder(into)]
    pub hosted_zone_name: Option<String>,
    /// Path pattern of this function when it joins an existing distribution.
    /// Defaults to `/<kebab-case function name>/*`.
    #[builder(into)]
    pub path_pattern: Option<String>,
}

pub struct FunctionUrlHook;

impl Hook for FunctionUrlHook {
    type Params = FunctionUrlParams;

    const NAME: &'static str = HOOK;

    fn apply(
        &self,
        mut config: ServiceConfig,
        params: &FunctionUrlParams,
        _ctx: &BuildContext,
    ) -> Result<ServiceConfig> {
        let function_name = require_str(HOOK, "functionName", params.function_name.as_deref())?;
        let subdomain = require_str(HOOK, "subdomain", params.subdomain.as_deref())?;
        let domain = require_str(
            HOOK,
            "domain",
            params
                .domain
                .as_deref()
                .or_else(|| section_str(&config.custom, "domain")),
        )?
        .to_string();
        let certificate_arn = params
            .certificate_arn
            .clone()
            .or_else(|| section_str(&config.custom, "certificateArn").map(str::to_string));
        let hosted_zone_name = params
            .hosted_zone_name
            .clone()
            .or_else(|| section_str(&config.custom, "hostedZoneName").map(str::to_string))
            .unwrap_or_else(|| format!("{domain}."));

        match config.functions.get_mut(function_name) {
            Some(Value::Object(function)) => {
                function.insert("url".into(), Value::Bool(true));
            }
            _ => {
                return Err(ValidationError::constraint(
                    HOOK,
                    "functionName",
                    format!("references unknown function `{function_name}`"),
                ));
            }
        }

        let host = format!("{subdomain}.{domain}");
        let stem = pascal_case(subdomain);
        let distribution_name = format!("{stem}Distribution");
        let record_name = format!("{stem}DnsRecord");

        let distribution = match config.resource(&distribution_name).cloned() {
            None => {
                let certificate_arn =
                    require_str(HOOK, "certificateArn", certificate_arn.as_deref())?;
                new_distribution(function_name, &host, certificate_arn)
            }
            Some(mut distribution) => {
                let path_pattern = params
                    .path_pattern
                    .clone()
                    .unwrap_or_else(|| format!("/{}/*", kebab_case(function_name)));
                add_origin(&mut distribution, function_name, &path_pattern);
                distribution
            }
        };
        config.add_resource(distribution_name.clone(), distribution);

        if !config.has_resource(&record_name) {
            config.add_resource(
                record_name,
                json!({
                    "Type": "AWS::Route53::RecordSet",
                    "Properties": {
                        "HostedZoneName": hosted_zone_name,
                        "Name": host,
                        "Type": "A",
                        "AliasTarget": {
                            "DNSName": { "Fn::GetAtt": [distribution_name, "DomainName"] },
                            "HostedZoneId": CLOUDFRONT_HOSTED_ZONE_ID,
                        },
                    },
                }),
            );
        }

        Ok(config)
    }
}

fn origin(function_name: &str) -> Value {
    let url_output = format!("{}LambdaFunctionUrl", function_logical_id(function_name));
    json!({
        "Id": function_name,
        // The function URL is `https://<host>/`; CloudFront wants the bare host.
        "DomainName": {
            "Fn::Select": [2, { "Fn::Split": ["/", { "Fn::GetAtt": [url_output, "FunctionUrl"] }] }],
        },
        "CustomOriginConfig": {
            "OriginProtocolPolicy": "https-only",
            "OriginSSLProtocols": ["TLSv1.2"],
        },
    })
}

fn cache_behavior(function_name: &str) -> Map<String, Value> {
    let mut behavior = Map::new();
    behavior.insert("TargetOriginId".into(), json!(function_name));
    behavior.insert("ViewerProtocolPolicy".into(), json!("redirect-to-https"));
    behavior.insert("AllowedMethods".into(), json!(ALLOWED_METHODS));
    behavior.insert("CachedMethods".into(), json!(CACHED_METHODS));
    behavior.insert("Compress".into(), json!(true));
    behavior.insert("CachePolicyId".into(), json!(CACHE_POLICY_ID));
    behavior.insert("OriginRequestPolicyId".into(), json!(ORIGIN_REQUEST_POLICY_ID));
    behavior
}

fn new_distribution(function_name: &str, host: &str, certificate_arn: &str) -> Value {
    json!({
        "Type": "AWS::CloudFront::Distribution",
        "Properties": {
            "DistributionConfig": {
                "Enabled": true,
                "HttpVersion": "http2",
                "PriceClass": "PriceClass_100",
                "Aliases": [host],
                "Origins": [origin(function_name)],
                "DefaultCacheBehavior": cache_behavior(function_name),
                "ViewerCertificate": {
                    "AcmCertificateArn": certificate_arn,
                    "SslSupportMethod": "sni-only",
                    "MinimumProtocolVersion": "TLSv1.2_2021",
                },
            },
        },
    })
}

fn add_origin(distribution: &mut Value, function_name: &str, path_pattern: &str) {
    let Value::Object(distribution) = distribution else {
        return;
    };
    let properties = object_entry(distribution, "Properties");
    let distribution_config = object_entry(properties, "DistributionConfig");

    let origins = array_entry(distribution_config, "Origins");
    if origins.iter().any(|origin| origin["Id"] == function_name) {
        debug!(function = function_name, "origin already present");
        return;
    }
    origins.push(origin(function_name));

    let mut behavior = cache_behavior(function_name);
    behavior.insert("PathPattern".into(), json!(path_pattern));
    array_entry(distribution_config, "CacheBehaviors").push(Value::Object(behavior));
}
