use serde_json::{json, Value};

use crate::identity::IdentityRef;
use crate::stack::{
    get_att, ref_to, sub, RemovalPolicy, Resource, ResourceKind, StackDescriptor, StackOutput,
};

pub const BUCKET_LOGICAL_ID: &str = "CanaryBucket";
pub const BUCKET_NAME_OUTPUT: &str = "BucketName";
pub const BUCKET_URL_OUTPUT: &str = "BucketUrl";
pub const TEMP_PREFIX: &str = "temp/";
pub const TEMP_EXPIRATION_DAYS: u32 = 31;

/// Object actions granted by a read/write grant on the bucket.
pub const READ_WRITE_ACTIONS: [&str; 10] = [
    "s3:GetObject*",
    "s3:GetBucket*",
    "s3:List*",
    "s3:DeleteObject*",
    "s3:PutObject",
    "s3:PutObjectLegalHold",
    "s3:PutObjectRetention",
    "s3:PutObjectTagging",
    "s3:PutObjectVersionTagging",
    "s3:Abort*",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleRule {
    pub id: String,
    pub prefix: String,
    pub expiration_days: u32,
}

impl LifecycleRule {
    pub fn expire_temp_objects() -> Self {
        Self {
            id: "ExpireTempObjects".to_string(),
            prefix: TEMP_PREFIX.to_string(),
            expiration_days: TEMP_EXPIRATION_DAYS,
        }
    }

    fn to_cfn(&self) -> Value {
        json!({
            "Id": self.id,
            "Prefix": self.prefix,
            "ExpirationInDays": self.expiration_days,
            "Status": "Enabled",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageStackConfig {
    pub stack_name: String,
    pub removal_policy: RemovalPolicy,
    pub lifecycle_rules: Vec<LifecycleRule>,
    pub grant_read_write: Vec<IdentityRef>,
}

impl StorageStackConfig {
    /// Destroy-on-teardown bucket with the `temp/` expiry rule.
    pub fn new(stack_name: impl Into<String>, grant_read_write: Vec<IdentityRef>) -> Self {
        Self {
            stack_name: stack_name.into(),
            removal_policy: RemovalPolicy::Destroy,
            lifecycle_rules: vec![LifecycleRule::expire_temp_objects()],
            grant_read_write,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grant {
    pub identity: IdentityRef,
    pub policy_logical_id: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StorageStack {
    pub descriptor: StackDescriptor,
    pub grants: Vec<Grant>,
}

pub fn build_storage_stack(config: &StorageStackConfig) -> StorageStack {
    let stack_name = config.stack_name.as_str();
    let mut descriptor = StackDescriptor::new(
        stack_name,
        "Canary object store with expiring temp/ prefix",
    );

    let rules: Vec<Value> = config
        .lifecycle_rules
        .iter()
        .map(LifecycleRule::to_cfn)
        .collect();
    let mut properties = json!({});
    if !rules.is_empty() {
        properties["LifecycleConfiguration"] = json!({ "Rules": rules });
    }
    descriptor.add_resource(
        Resource::new(BUCKET_LOGICAL_ID, ResourceKind::Bucket, properties)
            .with_removal_policy(config.removal_policy),
    );

    if config.grant_read_write.is_empty() {
        tracing::warn!(
            stack = stack_name,
            "no identities supplied; bucket is declared without external access"
        );
    }

    let mut grants = Vec::with_capacity(config.grant_read_write.len());
    for identity in &config.grant_read_write {
        let grant = grant_read_write(&mut descriptor, identity);
        grants.push(grant);
    }

    descriptor.add_output(
        StackOutput::new(BUCKET_NAME_OUTPUT, ref_to(BUCKET_LOGICAL_ID))
            .described("Provider-assigned bucket name"),
    );
    descriptor.add_output(
        StackOutput::new(
            BUCKET_URL_OUTPUT,
            sub(&bucket_url(
                &format!("${{{BUCKET_LOGICAL_ID}}}"),
                "${AWS::Region}",
            )),
        )
        .described("Virtual-hosted HTTPS URL of the bucket"),
    );

    tracing::info!(
        stack = stack_name,
        resources = descriptor.resources.len(),
        identities = grants.len(),
        "storage stack declared"
    );

    StorageStack { descriptor, grants }
}

pub fn bucket_url(bucket_name: &str, region: &str) -> String {
    format!("https://{bucket_name}.s3.{region}.amazonaws.com")
}

fn grant_read_write(descriptor: &mut StackDescriptor, identity: &IdentityRef) -> Grant {
    // Logical ids are alphanumeric only.
    let owner: String = identity
        .stack_name
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    let base_id = format!("{owner}{}ReadWritePolicy", identity.logical_id);
    let policy_logical_id = unique_logical_id(descriptor, &base_id);
    let bucket_arn = get_att(BUCKET_LOGICAL_ID, "Arn");
    let objects_arn = json!({ "Fn::Join": ["", [bucket_arn.clone(), "/*"]] });

    let mut properties = json!({
        "PolicyName": policy_logical_id,
        "PolicyDocument": {
            "Version": "2012-10-17",
            "Statement": [{
                "Action": READ_WRITE_ACTIONS,
                "Effect": "Allow",
                "Resource": [bucket_arn, objects_arn],
            }],
        },
    });
    properties[identity.kind.policy_attachment_key()] = json!([identity.import_name()]);

    descriptor.add_resource(Resource::new(
        policy_logical_id.clone(),
        ResourceKind::IamPolicy,
        properties,
    ));

    Grant {
        identity: identity.clone(),
        policy_logical_id,
    }
}

// Distinct identities may strip to the same owner prefix, and an identity may
// be listed twice; every grant still needs its own resource.
fn unique_logical_id(descriptor: &StackDescriptor, base_id: &str) -> String {
    if descriptor.resource(base_id).is_none() {
        return base_id.to_string();
    }
    (2..)
        .map(|suffix| format!("{base_id}{suffix}"))
        .find(|candidate| descriptor.resource(candidate).is_none())
        .unwrap_or_else(|| base_id.to_string())
}

#[cfg(test)]
mod tests {
    use crate::identity::PrincipalKind;

    use super::*;

    fn identity(kind: PrincipalKind, logical_id: &str) -> IdentityRef {
        IdentityRef {
            kind,
            stack_name: "Ids".to_string(),
            logical_id: logical_id.to_string(),
            export_name: format!("Ids:{logical_id}Name"),
        }
    }

    #[test]
    fn bucket_url_interpolates_name_and_region() {
        assert_eq!(
            bucket_url("b1", "us-east-1"),
            "https://b1.s3.us-east-1.amazonaws.com"
        );
    }

    #[test]
    fn issues_one_grant_per_identity() {
        let config = StorageStackConfig::new(
            "Store",
            vec![
                identity(PrincipalKind::User, "Alice"),
                identity(PrincipalKind::Role, "Worker"),
                identity(PrincipalKind::Role, "Auditor"),
            ],
        );

        let stack = build_storage_stack(&config);
        assert_eq!(stack.grants.len(), 3);

        let policies: Vec<&Resource> = stack
            .descriptor
            .resources
            .iter()
            .filter(|resource| resource.kind == ResourceKind::IamPolicy)
            .collect();
        assert_eq!(policies.len(), 3);
        assert_eq!(
            policies[0].properties["Users"],
            json!([{ "Fn::ImportValue": "Ids:AliceName" }])
        );
        assert_eq!(
            policies[1].properties["Roles"],
            json!([{ "Fn::ImportValue": "Ids:WorkerName" }])
        );
    }

    #[test]
    fn colliding_owner_prefixes_get_distinct_policies() {
        let mut hyphenated = identity(PrincipalKind::Role, "Worker");
        hyphenated.stack_name = "Team-A".to_string();
        let mut plain = identity(PrincipalKind::Role, "Worker");
        plain.stack_name = "TeamA".to_string();

        let stack =
            build_storage_stack(&StorageStackConfig::new("Store", vec![hyphenated, plain]));

        let ids: Vec<&str> = stack
            .grants
            .iter()
            .map(|grant| grant.policy_logical_id.as_str())
            .collect();
        assert_eq!(
            ids,
            vec!["TeamAWorkerReadWritePolicy", "TeamAWorkerReadWritePolicy2"]
        );

        let template = stack.descriptor.to_template().expect("template should render");
        let rendered_policies = template["Resources"]
            .as_object()
            .map(|resources| {
                resources
                    .values()
                    .filter(|entry| entry["Type"] == "AWS::IAM::Policy")
                    .count()
            })
            .unwrap_or_default();
        assert_eq!(rendered_policies, 2);
    }

    #[test]
    fn repeated_identity_keeps_one_grant_per_entry() {
        let worker = identity(PrincipalKind::Role, "Worker");
        let stack = build_storage_stack(&StorageStackConfig::new(
            "Store",
            vec![worker.clone(), worker.clone(), worker],
        ));

        assert_eq!(stack.grants.len(), 3);
        let template = stack.descriptor.to_template().expect("template should render");
        assert!(template["Resources"]["IdsWorkerReadWritePolicy"].is_object());
        assert!(template["Resources"]["IdsWorkerReadWritePolicy2"].is_object());
        assert!(template["Resources"]["IdsWorkerReadWritePolicy3"].is_object());
    }

    #[test]
    fn empty_identity_list_issues_no_grants() {
        let stack = build_storage_stack(&StorageStackConfig::new("Store", Vec::new()));

        assert!(stack.grants.is_empty());
        assert_eq!(stack.descriptor.resources.len(), 1);
        assert_eq!(stack.descriptor.outputs.len(), 2);
    }

    #[test]
    fn bucket_is_destroyed_on_teardown_and_expires_temp_objects() {
        let stack = build_storage_stack(&StorageStackConfig::new("Store", Vec::new()));
        let bucket = stack
            .descriptor
            .resource(BUCKET_LOGICAL_ID)
            .expect("bucket should be declared");

        assert_eq!(bucket.removal_policy, Some(RemovalPolicy::Destroy));
        assert_eq!(
            bucket.properties["LifecycleConfiguration"]["Rules"],
            json!([{
                "Id": "ExpireTempObjects",
                "Prefix": "temp/",
                "ExpirationInDays": 31,
                "Status": "Enabled",
            }])
        );
    }

    #[test]
    fn bucket_url_output_is_substituted_at_deploy_time() {
        let stack = build_storage_stack(&StorageStackConfig::new("Store", Vec::new()));

        assert_eq!(
            stack
                .descriptor
                .output(BUCKET_URL_OUTPUT)
                .map(|output| output.value.clone()),
            Some(json!({
                "Fn::Sub": "https://${CanaryBucket}.s3.${AWS::Region}.amazonaws.com"
            }))
        );
    }
}
