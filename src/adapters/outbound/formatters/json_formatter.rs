use crate::analysis::domain::AnalysisReport;
use crate::analysis::services::ReportSchema;
use crate::ports::outbound::ReportFormatter;
use crate::shared::Result;

/// JsonReportFormatter adapter rendering the report as pretty-printed JSON
///
/// The serialised report is schema-checked before it is returned, so a
/// report missing a required section never reaches the output.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonReportFormatter;

impl JsonReportFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl ReportFormatter for JsonReportFormatter {
    fn format(&self, report: &AnalysisReport) -> Result<String> {
        let value = serde_json::to_value(report)?;
        ReportSchema::validate_value(&value)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}
