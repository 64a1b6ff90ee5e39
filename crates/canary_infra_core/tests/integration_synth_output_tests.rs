use std::fs;

use canary_infra_core::assembly::{assemble, AssemblyManifest, MANIFEST_FILE_NAME};
use canary_infra_core::config::AssemblyConfig;
use canary_infra_core::template::template_fingerprint;
use serde_json::Value;

#[test]
fn write_to_emits_templates_and_manifest() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    let assembly = assemble(&AssemblyConfig::default());

    let manifest = assembly
        .write_to(dir.path())
        .expect("assembly should be written");

    let on_disk: AssemblyManifest = serde_json::from_str(
        &fs::read_to_string(dir.path().join(MANIFEST_FILE_NAME)).expect("manifest should exist"),
    )
    .expect("manifest should parse");
    assert_eq!(on_disk, manifest);

    for entry in &manifest.stacks {
        let body = fs::read_to_string(dir.path().join(&entry.template_file))
            .expect("template should exist");
        assert_eq!(template_fingerprint(&body), entry.template_sha256);

        let template: Value = serde_json::from_str(&body).expect("template should parse");
        assert_eq!(template["AWSTemplateFormatVersion"], "2010-09-09");
    }
}

#[test]
fn storage_template_declares_expiring_destroyable_bucket() {
    let dir = tempfile::tempdir().expect("temp dir should be created");
    assemble(&AssemblyConfig::default())
        .write_to(dir.path())
        .expect("assembly should be written");

    let body = fs::read_to_string(dir.path().join("CanaryStorageStack.template.json"))
        .expect("storage template should exist");
    let template: Value = serde_json::from_str(&body).expect("template should parse");
    let bucket = &template["Resources"]["CanaryBucket"];

    assert_eq!(bucket["DeletionPolicy"], "Delete");
    assert_eq!(
        bucket["Properties"]["LifecycleConfiguration"]["Rules"][0]["ExpirationInDays"],
        31
    );
    assert_eq!(
        bucket["Properties"]["LifecycleConfiguration"]["Rules"][0]["Prefix"],
        "temp/"
    );
}
