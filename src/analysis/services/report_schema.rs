use crate::analysis::domain::AnalysisReport;
use crate::shared::Result;
use serde_json::Value;

/// Top-level sections every serialised report must carry
pub const REQUIRED_SECTIONS: [&str; 4] = ["metadata", "summary", "packages", "recommendations"];

/// ReportSchema checks the serialised shape of a report.
pub struct ReportSchema;

impl ReportSchema {
    pub fn validate(report: &AnalysisReport) -> Result<()> {
        let value = serde_json::to_value(report)?;
        Self::validate_value(&value)
    }

    pub fn validate_value(value: &Value) -> Result<()> {
        let object = value
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("report is not a JSON object"))?;

        for section in REQUIRED_SECTIONS {
            if !object.contains_key(section) {
                anyhow::bail!("report is missing the '{}' section", section);
            }
        }

        if object["metadata"].get("run_id").and_then(Value::as_str).is_none() {
            anyhow::bail!("report metadata has no run_id");
        }
        if !object["recommendations"].is_array() {
            anyhow::bail!("report recommendations must be an array");
        }

        let packages = object["packages"]
            .as_object()
            .ok_or_else(|| anyhow::anyhow!("report packages must be an object"))?;
        for (key, package) in packages {
            let risk = package
                .get("risk_score")
                .and_then(Value::as_f64)
                .ok_or_else(|| anyhow::anyhow!("package '{}' has no risk_score", key))?;
            if !(0.0..=1.0).contains(&risk) {
                anyhow::bail!("package '{}' has risk_score {} outside [0, 1]", key, risk);
            }
            if let Some(composite) = package
                .get("reputation")
                .and_then(|r| r.get("composite"))
                .and_then(Value::as_f64)
            {
                if !(0.0..=1.0).contains(&composite) {
                    anyhow::bail!(
                        "package '{}' has reputation composite {} outside [0, 1]",
                        key,
                        composite
                    );
                }
            }
        }

        Ok(())
    }
}
