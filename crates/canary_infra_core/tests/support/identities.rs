use canary_infra_core::identity::{IdentityRef, PrincipalKind};

/// `count` distinct identities alternating between users and roles.
pub fn identities(count: usize) -> Vec<IdentityRef> {
    (0..count)
        .map(|index| {
            let kind = if index % 2 == 0 {
                PrincipalKind::User
            } else {
                PrincipalKind::Role
            };
            let logical_id = format!("Principal{index}");
            IdentityRef {
                kind,
                stack_name: "SupportIdentities".to_string(),
                export_name: format!("SupportIdentities:{logical_id}Name"),
                logical_id,
            }
        })
        .collect()
}
