/// Mock implementations for testing
mod mock_ecosystem_adapter;
mod mock_progress_reporter;
mod mock_registry_client;
mod mock_stage_analyzer;

pub use mock_ecosystem_adapter::MockEcosystemAdapter;
pub use mock_progress_reporter::MockProgressReporter;
pub use mock_registry_client::MockRegistryClient;
pub use mock_stage_analyzer::MockStageAnalyzer;
