/// Ecosystem adapters that read project manifests
mod npm_manifest;
mod python_requirements;

pub use npm_manifest::NpmManifestAdapter;
pub use python_requirements::PythonRequirementsAdapter;
