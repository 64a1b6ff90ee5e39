//! CloudFormation rendering of stack descriptors.

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::stack::StackDescriptor;

pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

#[derive(Debug, thiserror::Error)]
pub enum SynthError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("stack {stack} declares logical id {logical_id} more than once")]
    DuplicateLogicalId { stack: String, logical_id: String },
    #[error("failed to serialize template for stack {stack}: {source}")]
    Serialize {
        stack: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StackDescriptor {
    /// Renders the CloudFormation body; a repeated logical id is an error
    /// rather than a silent overwrite.
    pub fn to_template(&self) -> Result<Value, SynthError> {
        let mut resources = Map::new();
        for resource in &self.resources {
            let mut entry = json!({
                "Type": resource.kind.cfn_type(),
                "Properties": resource.properties,
            });
            if !resource.depends_on.is_empty() {
                entry["DependsOn"] = json!(resource.depends_on);
            }
            if let Some(policy) = resource.removal_policy {
                entry["DeletionPolicy"] = json!(policy.as_cfn_policy());
                entry["UpdateReplacePolicy"] = json!(policy.as_cfn_policy());
            }
            if resources.insert(resource.logical_id.clone(), entry).is_some() {
                return Err(SynthError::DuplicateLogicalId {
                    stack: self.name.clone(),
                    logical_id: resource.logical_id.clone(),
                });
            }
        }

        let mut outputs = Map::new();
        for output in &self.outputs {
            let mut entry = json!({ "Value": output.value });
            if let Some(description) = &output.description {
                entry["Description"] = json!(description);
            }
            if let Some(export_name) = &output.export_name {
                entry["Export"] = json!({ "Name": export_name });
            }
            outputs.insert(output.name.clone(), entry);
        }

        Ok(json!({
            "AWSTemplateFormatVersion": TEMPLATE_FORMAT_VERSION,
            "Description": self.description,
            "Resources": resources,
            "Outputs": outputs,
        }))
    }

    pub fn template_json(&self) -> Result<String, SynthError> {
        serde_json::to_string_pretty(&self.to_template()?).map_err(|source| {
            SynthError::Serialize {
                stack: self.name.clone(),
                source,
            }
        })
    }

    pub fn template_file_name(&self) -> String {
        format!("{}.template.json", self.name)
    }
}

/// Hex SHA-256 of a rendered template body.
pub fn template_fingerprint(template_json: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(template_json.as_bytes());
    format!("{:x}", hasher.finalize())
}
