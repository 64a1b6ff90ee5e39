use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    IamUser,
    IamRole,
    IamPolicy,
    LambdaFunction,
    LambdaPermission,
    RestApi,
    ApiResource,
    ApiMethod,
    ApiDeployment,
    ApiStage,
    Bucket,
}

impl ResourceKind {
    pub fn cfn_type(self) -> &'static str {
        match self {
            Self::IamUser => "AWS::IAM::User",
            Self::IamRole => "AWS::IAM::Role",
            Self::IamPolicy => "AWS::IAM::Policy",
            Self::LambdaFunction => "AWS::Lambda::Function",
            Self::LambdaPermission => "AWS::Lambda::Permission",
            Self::RestApi => "AWS::ApiGateway::RestApi",
            Self::ApiResource => "AWS::ApiGateway::Resource",
            Self::ApiMethod => "AWS::ApiGateway::Method",
            Self::ApiDeployment => "AWS::ApiGateway::Deployment",
            Self::ApiStage => "AWS::ApiGateway::Stage",
            Self::Bucket => "AWS::S3::Bucket",
        }
    }
}

/// What happens to a resource when its stack is torn down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemovalPolicy {
    Destroy,
    #[default]
    Retain,
}

impl RemovalPolicy {
    pub fn as_cfn_policy(self) -> &'static str {
        match self {
            Self::Destroy => "Delete",
            Self::Retain => "Retain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub logical_id: String,
    pub kind: ResourceKind,
    pub properties: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removal_policy: Option<RemovalPolicy>,
}

impl Resource {
    pub fn new(logical_id: impl Into<String>, kind: ResourceKind, properties: Value) -> Self {
        Self {
            logical_id: logical_id.into(),
            kind,
            properties,
            depends_on: Vec::new(),
            removal_policy: None,
        }
    }

    pub fn depends_on(mut self, logical_id: impl Into<String>) -> Self {
        self.depends_on.push(logical_id.into());
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal_policy = Some(policy);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackOutput {
    pub name: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub export_name: Option<String>,
}

impl StackOutput {
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            description: None,
            export_name: None,
        }
    }

    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn exported_as(mut self, export_name: impl Into<String>) -> Self {
        self.export_name = Some(export_name.into());
        self
    }
}

/// A named, independently deployable set of declared resources and outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StackDescriptor {
    pub name: String,
    pub description: String,
    pub resources: Vec<Resource>,
    pub outputs: Vec<StackOutput>,
}

impl StackDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            resources: Vec::new(),
            outputs: Vec::new(),
        }
    }

    pub fn add_resource(&mut self, resource: Resource) {
        self.resources.push(resource);
    }

    pub fn add_output(&mut self, output: StackOutput) {
        self.outputs.push(output);
    }

    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources
            .iter()
            .find(|resource| resource.logical_id == logical_id)
    }

    pub fn output(&self, name: &str) -> Option<&StackOutput> {
        self.outputs.iter().find(|output| output.name == name)
    }
}

pub fn ref_to(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

pub fn import_value(export_name: &str) -> Value {
    json!({ "Fn::ImportValue": export_name })
}

pub fn sub(template: &str) -> Value {
    json!({ "Fn::Sub": template })
}
