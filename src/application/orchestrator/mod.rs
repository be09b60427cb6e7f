//! Staged analysis pipeline
mod analysis_orchestrator;
mod analysis_run;
mod stage_budgets;

pub use analysis_orchestrator::AnalysisOrchestrator;
pub use analysis_run::AnalysisRun;
pub use stage_budgets::StageBudgets;
