//! Environment-driven configuration for assembling the canary stacks.

use crate::api::CodeBundle;

pub const IDENTITY_STACK_NAME: &str = "CanaryIdentityStack";
pub const STORAGE_STACK_NAME: &str = "CanaryStorageStack";
pub const API_STACK_NAME: &str = "CanaryApiStack";

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_ACCOUNT: &str = "000000000000";
pub const DEFAULT_CODE_BUCKET: &str = "canary-artifacts";
pub const DEFAULT_CODE_KEY: &str = "canary/runtime.zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyConfig {
    pub region: String,
    pub account: String,
    pub code: CodeBundle,
    pub log_level: String,
}

impl Default for AssemblyConfig {
    fn default() -> Self {
        Self {
            region: DEFAULT_REGION.to_string(),
            account: DEFAULT_ACCOUNT.to_string(),
            code: CodeBundle {
                s3_bucket: DEFAULT_CODE_BUCKET.to_string(),
                s3_key: DEFAULT_CODE_KEY.to_string(),
            },
            log_level: "info".to_string(),
        }
    }
}

impl AssemblyConfig {
    /// Reads `CANARY_*` variables, falling back to the standard AWS/CDK ones.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |keys: &[&str]| {
            keys.iter()
                .filter_map(|key| lookup(*key))
                .map(|value| value.trim().to_string())
                .find(|value| !value.is_empty())
        };

        let mut config = Self::default();
        if let Some(v) = first(&["CANARY_REGION", "AWS_REGION", "CDK_DEFAULT_REGION"]) {
            config.region = v;
        }
        if let Some(v) = first(&["CANARY_ACCOUNT", "CDK_DEFAULT_ACCOUNT"]) {
            config.account = v;
        }
        if let Some(v) = first(&["CANARY_CODE_BUCKET"]) {
            config.code.s3_bucket = v;
        }
        if let Some(v) = first(&["CANARY_CODE_KEY"]) {
            config.code.s3_key = v;
        }
        if let Some(v) = first(&["CANARY_LOG_LEVEL"]) {
            config.log_level = v;
        }
        config
    }
}
