use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::stack::{
    import_value, ref_to, sub, Resource, ResourceKind, StackDescriptor, StackOutput,
};

pub const USER_LOGICAL_ID: &str = "CanaryUser";
pub const ROLE_LOGICAL_ID: &str = "CanaryRole";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalKind {
    User,
    Role,
}

impl PrincipalKind {
    /// Key under which an `AWS::IAM::Policy` attaches to principals of this kind.
    pub fn policy_attachment_key(self) -> &'static str {
        match self {
            Self::User => "Users",
            Self::Role => "Roles",
        }
    }
}

/// Read-only handle on an identity declared by another stack.
///
/// The physical name is only known after deployment, so consumers reach it
/// through the owning stack's export.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IdentityRef {
    pub kind: PrincipalKind,
    pub stack_name: String,
    pub logical_id: String,
    pub export_name: String,
}

impl IdentityRef {
    pub fn import_name(&self) -> Value {
        import_value(&self.export_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityStackConfig {
    pub stack_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IdentityStack {
    pub descriptor: StackDescriptor,
    pub user: IdentityRef,
    pub role: IdentityRef,
}

impl IdentityStack {
    pub fn identities(&self) -> Vec<IdentityRef> {
        vec![self.user.clone(), self.role.clone()]
    }
}

pub fn build_identity_stack(config: &IdentityStackConfig) -> IdentityStack {
    let stack_name = config.stack_name.as_str();
    let mut descriptor = StackDescriptor::new(
        stack_name,
        "Principals granted access by the canary storage stack",
    );

    descriptor.add_resource(Resource::new(
        USER_LOGICAL_ID,
        ResourceKind::IamUser,
        json!({}),
    ));
    descriptor.add_resource(Resource::new(
        ROLE_LOGICAL_ID,
        ResourceKind::IamRole,
        json!({
            "AssumeRolePolicyDocument": {
                "Version": "2012-10-17",
                "Statement": [{
                    "Action": "sts:AssumeRole",
                    "Effect": "Allow",
                    "Principal": {
                        "AWS": sub("arn:${AWS::Partition}:iam::${AWS::AccountId}:root"),
                    },
                }],
            },
        }),
    ));

    let user = identity_ref(stack_name, PrincipalKind::User, USER_LOGICAL_ID);
    let role = identity_ref(stack_name, PrincipalKind::Role, ROLE_LOGICAL_ID);

    for identity in [&user, &role] {
        descriptor.add_output(
            StackOutput::new(
                format!("{}Name", identity.logical_id),
                ref_to(&identity.logical_id),
            )
            .exported_as(identity.export_name.clone()),
        );
    }

    tracing::info!(
        stack = stack_name,
        resources = descriptor.resources.len(),
        outputs = descriptor.outputs.len(),
        "identity stack declared"
    );

    IdentityStack {
        descriptor,
        user,
        role,
    }
}

fn identity_ref(stack_name: &str, kind: PrincipalKind, logical_id: &str) -> IdentityRef {
    IdentityRef {
        kind,
        stack_name: stack_name.to_string(),
        logical_id: logical_id.to_string(),
        export_name: format!("{stack_name}:{logical_id}Name"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> IdentityStackConfig {
        IdentityStackConfig {
            stack_name: "TestIdentity".to_string(),
        }
    }

    #[test]
    fn declares_exactly_one_user_and_one_role() {
        let stack = build_identity_stack(&config());

        let kinds: Vec<ResourceKind> = stack
            .descriptor
            .resources
            .iter()
            .map(|resource| resource.kind)
            .collect();
        assert_eq!(kinds, vec![ResourceKind::IamUser, ResourceKind::IamRole]);
        assert_eq!(stack.user.kind, PrincipalKind::User);
        assert_eq!(stack.role.kind, PrincipalKind::Role);
    }

    #[test]
    fn exports_each_identity_for_cross_stack_use() {
        let stack = build_identity_stack(&config());

        let exports: Vec<Option<String>> = stack
            .descriptor
            .outputs
            .iter()
            .map(|output| output.export_name.clone())
            .collect();
        assert_eq!(
            exports,
            vec![
                Some("TestIdentity:CanaryUserName".to_string()),
                Some("TestIdentity:CanaryRoleName".to_string()),
            ]
        );
        assert_eq!(
            stack.role.import_name(),
            json!({ "Fn::ImportValue": "TestIdentity:CanaryRoleName" })
        );
    }
}
