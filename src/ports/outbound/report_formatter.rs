use crate::analysis::domain::AnalysisReport;
use crate::shared::Result;

/// ReportFormatter port for rendering an analysis report
pub trait ReportFormatter {
    /// Formats the report into its textual representation
    ///
    /// # Errors
    /// Returns an error if serialization fails
    fn format(&self, report: &AnalysisReport) -> Result<String>;
}
