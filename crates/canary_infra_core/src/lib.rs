//! Declarative stack descriptors for the signed-request canary.
//!
//! Each stack is built by a plain function from a configuration struct and
//! returns a `StackDescriptor`; cross-stack references are passed in
//! explicitly. This crate renders CloudFormation templates but never talks to
//! AWS itself.

pub mod api;
pub mod assembly;
pub mod config;
pub mod identity;
pub mod stack;
pub mod storage;
pub mod template;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;
