use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::api::{build_api_stack, ApiStackConfig};
use crate::config::{AssemblyConfig, API_STACK_NAME, IDENTITY_STACK_NAME, STORAGE_STACK_NAME};
use crate::identity::{build_identity_stack, IdentityStackConfig};
use crate::stack::StackDescriptor;
use crate::storage::{build_storage_stack, Grant, StorageStackConfig};
use crate::template::{template_fingerprint, SynthError};

pub const MANIFEST_FILE_NAME: &str = "manifest.json";
pub const MANIFEST_SCHEMA_VERSION: &str = "v1";

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledStack {
    pub descriptor: StackDescriptor,
    pub depends_on: Vec<String>,
}

/// Stacks in the order they were constructed, with their deploy-time edges.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudAssembly {
    pub region: String,
    pub account: String,
    pub stacks: Vec<AssembledStack>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestEntry {
    pub stack_name: String,
    pub template_file: String,
    pub template_sha256: String,
    pub depends_on: Vec<String>,
    pub environment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssemblyManifest {
    pub schema_version: String,
    pub stacks: Vec<ManifestEntry>,
}

pub fn assemble(config: &AssemblyConfig) -> CloudAssembly {
    assemble_with(config, &mut |_: &AssembledStack| {})
}

/// Builds the stacks, handing each one to `on_stack` as soon as it is
/// constructed. The identity stack's outputs are an input of the storage
/// stack, so it is always reported first.
pub fn assemble_with(
    config: &AssemblyConfig,
    on_stack: &mut dyn FnMut(&AssembledStack),
) -> CloudAssembly {
    let mut stacks = Vec::with_capacity(3);
    let mut record = |stack: AssembledStack| {
        on_stack(&stack);
        stacks.push(stack);
    };

    let identity = build_identity_stack(&IdentityStackConfig {
        stack_name: IDENTITY_STACK_NAME.to_string(),
    });
    let identities = identity.identities();
    record(AssembledStack {
        descriptor: identity.descriptor,
        depends_on: Vec::new(),
    });

    let storage = build_storage_stack(&StorageStackConfig::new(STORAGE_STACK_NAME, identities));
    record(AssembledStack {
        depends_on: stacks_referenced(&storage.grants),
        descriptor: storage.descriptor,
    });

    let api = build_api_stack(&ApiStackConfig::new(API_STACK_NAME, config.code.clone()));
    record(AssembledStack {
        descriptor: api.descriptor,
        depends_on: Vec::new(),
    });

    tracing::info!(
        region = %config.region,
        account = %config.account,
        stacks = stacks.len(),
        "cloud assembly built"
    );

    CloudAssembly {
        region: config.region.clone(),
        account: config.account.clone(),
        stacks,
    }
}

impl CloudAssembly {
    pub fn stack(&self, name: &str) -> Option<&AssembledStack> {
        self.stacks
            .iter()
            .find(|stack| stack.descriptor.name == name)
    }

    pub fn manifest(&self) -> Result<AssemblyManifest, SynthError> {
        let environment = format!("aws://{}/{}", self.account, self.region);
        let mut entries = Vec::with_capacity(self.stacks.len());
        for stack in &self.stacks {
            let template_json = stack.descriptor.template_json()?;
            entries.push(ManifestEntry {
                stack_name: stack.descriptor.name.clone(),
                template_file: stack.descriptor.template_file_name(),
                template_sha256: template_fingerprint(&template_json),
                depends_on: stack.depends_on.clone(),
                environment: environment.clone(),
            });
        }

        Ok(AssemblyManifest {
            schema_version: MANIFEST_SCHEMA_VERSION.to_string(),
            stacks: entries,
        })
    }

    /// Writes one template per stack plus `manifest.json` into `out_dir`.
    pub fn write_to(&self, out_dir: &Path) -> Result<AssemblyManifest, SynthError> {
        fs::create_dir_all(out_dir).map_err(|source| SynthError::Io {
            path: out_dir.display().to_string(),
            source,
        })?;

        for stack in &self.stacks {
            let path = out_dir.join(stack.descriptor.template_file_name());
            write_file(&path, &stack.descriptor.template_json()?)?;
            tracing::debug!(
                stack = %stack.descriptor.name,
                path = %path.display(),
                "template written"
            );
        }

        let manifest = self.manifest()?;
        let manifest_json =
            serde_json::to_string_pretty(&manifest).map_err(|source| SynthError::Serialize {
                stack: MANIFEST_FILE_NAME.to_string(),
                source,
            })?;
        write_file(&out_dir.join(MANIFEST_FILE_NAME), &manifest_json)?;

        Ok(manifest)
    }
}

fn stacks_referenced(grants: &[Grant]) -> Vec<String> {
    let mut names: Vec<String> = grants
        .iter()
        .map(|grant| grant.identity.stack_name.clone())
        .collect();
    names.sort_unstable();
    names.dedup();
    names
}

fn write_file(path: &Path, contents: &str) -> Result<(), SynthError> {
    fs::write(path, contents).map_err(|source| SynthError::Io {
        path: path.display().to_string(),
        source,
    })
}
