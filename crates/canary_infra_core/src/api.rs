use serde_json::json;

use crate::stack::{get_att, ref_to, sub, Resource, ResourceKind, StackDescriptor, StackOutput};

pub const FUNCTION_LOGICAL_ID: &str = "CanaryFunction";
pub const FUNCTION_ROLE_LOGICAL_ID: &str = "CanaryFunctionRole";
pub const REST_API_LOGICAL_ID: &str = "CanaryApi";
pub const PROXY_RESOURCE_LOGICAL_ID: &str = "CanaryApiProxy";
pub const ROOT_METHOD_LOGICAL_ID: &str = "CanaryApiRootAny";
pub const PROXY_METHOD_LOGICAL_ID: &str = "CanaryApiProxyAny";
pub const DEPLOYMENT_LOGICAL_ID: &str = "CanaryApiDeployment";
pub const STAGE_LOGICAL_ID: &str = "CanaryApiStage";
pub const INVOKE_PERMISSION_LOGICAL_ID: &str = "CanaryApiInvokePermission";
pub const API_URL_OUTPUT: &str = "ApiUrl";

/// Gateway authorization type that requires SigV4-signed requests.
pub const SIGNED_REQUEST_AUTHORIZATION: &str = "AWS_IAM";

/// Location of the packaged `bootstrap` zip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBundle {
    pub s3_bucket: String,
    pub s3_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiStackConfig {
    pub stack_name: String,
    pub code: CodeBundle,
    pub stage_name: String,
    pub memory_size_mb: u32,
    pub timeout_seconds: u32,
}

impl ApiStackConfig {
    pub fn new(stack_name: impl Into<String>, code: CodeBundle) -> Self {
        Self {
            stack_name: stack_name.into(),
            code,
            stage_name: "prod".to_string(),
            memory_size_mb: 128,
            timeout_seconds: 3,
        }
    }
}

/// Gateway route, both bound with `ANY` and signed-request authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Proxy,
}

impl Route {
    pub fn path(self) -> &'static str {
        match self {
            Self::Root => "/",
            Self::Proxy => "/{proxy+}",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiStack {
    pub descriptor: StackDescriptor,
    pub routes: Vec<Route>,
}

pub fn build_api_stack(config: &ApiStackConfig) -> ApiStack {
    let stack_name = config.stack_name.as_str();
    let mut descriptor = StackDescriptor::new(
        stack_name,
        "Signed-request canary endpoint backed by a fixed-response function",
    );

    declare_function(&mut descriptor, config);

    descriptor.add_resource(Resource::new(
        REST_API_LOGICAL_ID,
        ResourceKind::RestApi,
        json!({ "Name": format!("{stack_name}-canary") }),
    ));
    descriptor.add_resource(Resource::new(
        PROXY_RESOURCE_LOGICAL_ID,
        ResourceKind::ApiResource,
        json!({
            "ParentId": get_att(REST_API_LOGICAL_ID, "RootResourceId"),
            "PathPart": "{proxy+}",
            "RestApiId": ref_to(REST_API_LOGICAL_ID),
        }),
    ));

    let routes = vec![Route::Root, Route::Proxy];
    for route in &routes {
        declare_any_method(&mut descriptor, *route);
    }

    // A deployment snapshots the methods that exist when it is created.
    descriptor.add_resource(
        Resource::new(
            DEPLOYMENT_LOGICAL_ID,
            ResourceKind::ApiDeployment,
            json!({ "RestApiId": ref_to(REST_API_LOGICAL_ID) }),
        )
        .depends_on(ROOT_METHOD_LOGICAL_ID)
        .depends_on(PROXY_METHOD_LOGICAL_ID),
    );
    descriptor.add_resource(Resource::new(
        STAGE_LOGICAL_ID,
        ResourceKind::ApiStage,
        json!({
            "RestApiId": ref_to(REST_API_LOGICAL_ID),
            "DeploymentId": ref_to(DEPLOYMENT_LOGICAL_ID),
            "StageName": config.stage_name,
        }),
    ));
    descriptor.add_resource(Resource::new(
        INVOKE_PERMISSION_LOGICAL_ID,
        ResourceKind::LambdaPermission,
        json!({
            "Action": "lambda:InvokeFunction",
            "FunctionName": get_att(FUNCTION_LOGICAL_ID, "Arn"),
            "Principal": "apigateway.amazonaws.com",
            "SourceArn": sub(&format!(
                "arn:${{AWS::Partition}}:execute-api:${{AWS::Region}}:${{AWS::AccountId}}:${{{REST_API_LOGICAL_ID}}}/*/*/*"
            )),
        }),
    ));

    let invoke_url = format!(
        "https://${{{REST_API_LOGICAL_ID}}}.execute-api.${{AWS::Region}}.${{AWS::URLSuffix}}/${{{STAGE_LOGICAL_ID}}}/"
    );
    descriptor.add_output(
        StackOutput::new(API_URL_OUTPUT, sub(strip_trailing_slash(&invoke_url)))
            .described("Base URL of the signed-request canary API"),
    );

    tracing::info!(
        stack = stack_name,
        resources = descriptor.resources.len(),
        routes = routes.len(),
        "api stack declared"
    );

    ApiStack { descriptor, routes }
}

/// Drops one trailing `/` if present; other URLs pass through unchanged.
pub fn strip_trailing_slash(url: &str) -> &str {
    url.strip_suffix('/').unwrap_or(url)
}

fn declare_function(descriptor: &mut StackDescriptor, config: &ApiStackConfig) {
    descriptor.add_resource(Resource::new(
        FUNCTION_ROLE_LOGICAL_ID,
        ResourceKind::IamRole,
        json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": { "Service": "lambda.amazonaws.com" },
                }],
            },
            "ManagedPolicyArns": [
                sub("arn:${AWS::Partition}:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole"),
            ],
        }),
    ));

    descriptor.add_resource(
        Resource::new(
            FUNCTION_LOGICAL_ID,
            ResourceKind::LambdaFunction,
            json!({
                "Code": {
                    "S3Bucket": config.code.s3_bucket,
                    "S3Key": config.code.s3_key,
                },
                "Handler": "bootstrap",
                "Runtime": "provided.al2023",
                "Architectures": ["x86_64"],
                "MemorySize": config.memory_size_mb,
                "Timeout": config.timeout_seconds,
                "Role": get_att(FUNCTION_ROLE_LOGICAL_ID, "Arn"),
            }),
        )
        .depends_on(FUNCTION_ROLE_LOGICAL_ID),
    );
}

fn declare_any_method(descriptor: &mut StackDescriptor, route: Route) {
    let (logical_id, resource_id) = match route {
        Route::Root => (
            ROOT_METHOD_LOGICAL_ID,
            get_att(REST_API_LOGICAL_ID, "RootResourceId"),
        ),
        Route::Proxy => (PROXY_METHOD_LOGICAL_ID, ref_to(PROXY_RESOURCE_LOGICAL_ID)),
    };

    descriptor.add_resource(Resource::new(
        logical_id,
        ResourceKind::ApiMethod,
        json!({
            "HttpMethod": "ANY",
            "AuthorizationType": SIGNED_REQUEST_AUTHORIZATION,
            "ResourceId": resource_id,
            "RestApiId": ref_to(REST_API_LOGICAL_ID),
            "Integration": {
                "Type": "AWS_PROXY",
                "IntegrationHttpMethod": "POST",
                "Uri": sub(&format!(
                    "arn:${{AWS::Partition}}:apigateway:${{AWS::Region}}:lambda:path/2015-03-31/functions/${{{FUNCTION_LOGICAL_ID}.Arn}}/invocations"
                )),
            },
        }),
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ApiStackConfig {
        ApiStackConfig::new(
            "TestApi",
            CodeBundle {
                s3_bucket: "artifacts".to_string(),
                s3_key: "canary/runtime.zip".to_string(),
            },
        )
    }

    #[test]
    fn strip_trailing_slash_is_conditional() {
        assert_eq!(
            strip_trailing_slash("https://x.example.com/"),
            "https://x.example.com"
        );
        assert_eq!(
            strip_trailing_slash("https://x.example.com"),
            "https://x.example.com"
        );
    }

    #[test]
    fn every_route_accepts_any_method_with_signed_requests() {
        let stack = build_api_stack(&config());

        let methods: Vec<&Resource> = stack
            .descriptor
            .resources
            .iter()
            .filter(|resource| resource.kind == ResourceKind::ApiMethod)
            .collect();
        assert_eq!(methods.len(), 2);
        for method in methods {
            assert_eq!(method.properties["HttpMethod"], "ANY");
            assert_eq!(method.properties["AuthorizationType"], "AWS_IAM");
        }
        assert_eq!(
            stack
                .routes
                .iter()
                .map(|route| route.path())
                .collect::<Vec<_>>(),
            vec!["/", "/{proxy+}"]
        );
    }

    #[test]
    fn function_code_comes_from_fixed_bundle() {
        let stack = build_api_stack(&config());
        let function = stack
            .descriptor
            .resource(FUNCTION_LOGICAL_ID)
            .expect("function should be declared");

        assert_eq!(
            function.properties["Code"],
            json!({ "S3Bucket": "artifacts", "S3Key": "canary/runtime.zip" })
        );
        assert_eq!(function.properties["Handler"], "bootstrap");
    }

    #[test]
    fn api_url_output_has_no_trailing_slash() {
        let stack = build_api_stack(&config());
        let output = stack
            .descriptor
            .output(API_URL_OUTPUT)
            .expect("url output should be declared");

        let url = output.value["Fn::Sub"].as_str().unwrap_or_default();
        assert_eq!(
            url,
            "https://${CanaryApi}.execute-api.${AWS::Region}.${AWS::URLSuffix}/${CanaryApiStage}"
        );
    }
}
