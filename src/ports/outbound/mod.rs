/// Outbound ports (Driven ports) - Infrastructure interfaces
///
/// These ports define the interfaces that the application core uses
/// to interact with external systems (registries, vulnerability databases,
/// cache storage, file system, console, etc.).
pub mod cache_store;
pub mod ecosystem_adapter;
pub mod finding_detector;
pub mod output_presenter;
pub mod progress_reporter;
pub mod registry_client;
pub mod report_formatter;
pub mod stage_analyzer;

pub use cache_store::{CacheEntry, CacheStore};
pub use ecosystem_adapter::EcosystemAdapter;
pub use finding_detector::FindingDetector;
pub use output_presenter::OutputPresenter;
pub use progress_reporter::ProgressReporter;
pub use registry_client::RegistryClient;
pub use report_formatter::ReportFormatter;
pub use stage_analyzer::StageAnalyzer;
