/// Outbound adapters - Infrastructure implementations of outbound ports
pub mod cache;
pub mod console;
pub mod detectors;
pub mod filesystem;
pub mod formatters;
pub mod manifests;
pub mod network;
pub mod stages;
