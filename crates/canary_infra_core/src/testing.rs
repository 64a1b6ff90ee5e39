//! Assertion helpers for tests that inspect declared stacks.

use serde_json::Value;

use crate::stack::{Resource, ResourceKind, StackDescriptor};

pub trait StackAssertions {
    fn resources_of_kind(&self, kind: ResourceKind) -> Vec<&Resource>;

    fn resource_count(&self, kind: ResourceKind) -> usize {
        self.resources_of_kind(kind).len()
    }

    fn output_value(&self, name: &str) -> Option<&Value>;
}

impl StackAssertions for StackDescriptor {
    fn resources_of_kind(&self, kind: ResourceKind) -> Vec<&Resource> {
        self.resources
            .iter()
            .filter(|resource| resource.kind == kind)
            .collect()
    }

    fn output_value(&self, name: &str) -> Option<&Value> {
        self.output(name).map(|output| &output.value)
    }
}
