use super::path_tracer::{PathTracer, TraceOutcome};
use crate::analysis::domain::{
    AnalysisReport, ConflictIssue, Degradation, DegradationLevel, DependencyGraph, Finding,
    FindingType, GraphIssues, PackageId, PackageReport, ReportMetadata, ReportSummary,
    ResolutionStatus, SeverityCounts, SkippedAnalysis, StageContext, StageName, StageResult,
    StageSummary, UnresolvedIssue,
};
use crate::analysis::policies::{DegradationPolicy, RiskPolicy, HIGH_RISK_THRESHOLD};
use std::collections::{BTreeMap, HashSet};

pub const TOOL_NAME: &str = "chainsight";

/// Dependency chains listed per package
pub const REPORT_PATHS_PER_PACKAGE: usize = 10;

/// ReportSynthesizer merges every stage result into the final report.
///
/// Pure: all inputs come from the [`StageContext`].
pub struct ReportSynthesizer;

impl ReportSynthesizer {
    /// Full report from every available stage result
    pub fn synthesize(ctx: &StageContext<'_>) -> AnalysisReport {
        let level = DegradationPolicy::level(ctx.results, ctx.triggered);
        let skipped = DegradationPolicy::skipped(ctx.results);
        let sources: BTreeMap<StageName, &StageResult> =
            ctx.results.iter().map(|(k, v)| (*k, v)).collect();
        Self::build(ctx, &sources, level, skipped)
    }

    /// Reduced report used when synthesis itself failed.
    ///
    /// Only successful stage results feed the package view; the degradation
    /// section lists every failure including synthesis.
    pub fn reduced(ctx: &StageContext<'_>, synthesis_failure: &str) -> AnalysisReport {
        let mut skipped = DegradationPolicy::skipped(ctx.results);
        skipped.push(SkippedAnalysis {
            stage: StageName::Synthesis,
            reason: synthesis_failure.to_string(),
            fallback: DegradationPolicy::fallback_description(StageName::Synthesis).to_string(),
        });
        let sources: BTreeMap<StageName, &StageResult> = ctx
            .results
            .iter()
            .filter(|(_, r)| r.success)
            .map(|(k, v)| (*k, v))
            .collect();
        Self::build(ctx, &sources, DegradationLevel::Minimal, skipped)
    }

    fn build(
        ctx: &StageContext<'_>,
        sources: &BTreeMap<StageName, &StageResult>,
        level: DegradationLevel,
        skipped: Vec<SkippedAnalysis>,
    ) -> AnalysisReport {
        let vulnerabilities = sources
            .get(&StageName::Vulnerability)
            .and_then(|r| r.payload.as_vulnerability());
        let reputation = sources
            .get(&StageName::Reputation)
            .and_then(|r| r.payload.as_reputation());

        let traces = PathTracer::trace_all(ctx.graph, REPORT_PATHS_PER_PACKAGE);
        let untraced = TraceOutcome::default();

        let mut packages = BTreeMap::new();
        for id in ctx.graph.packages() {
            let key = id.key();
            let vulns = vulnerabilities.and_then(|p| p.packages.get(&key));
            let score = reputation.and_then(|p| p.packages.get(&key));

            let mut findings: Vec<Finding> =
                ctx.findings_for(&key).into_iter().cloned().collect();
            if let Some(rep) = reputation {
                findings.extend(rep.findings.iter().filter(|f| f.package == *id).cloned());
            }
            for stage in [StageName::DeepInspection, StageName::SupplyChainPattern] {
                if let Some(extra) = sources
                    .get(&stage)
                    .and_then(|r| r.payload.package_findings())
                    .and_then(|m| m.get(&key))
                {
                    findings.extend(extra.iter().cloned());
                }
            }

            let risk_score = RiskPolicy::package_risk(vulns, score, &findings);
            let trace = traces.get(id).unwrap_or(&untraced);
            let dependency_paths = trace
                .paths
                .iter()
                .map(|path| path.iter().skip(1).map(|p| p.to_string()).collect())
                .collect();

            packages.insert(
                key,
                PackageReport {
                    id: id.clone(),
                    vulnerabilities: vulns.map(|v| v.vulnerabilities.clone()).unwrap_or_default(),
                    reputation: score.cloned(),
                    findings,
                    risk_score,
                    dependency_paths,
                    paths_truncated_by_cycle: trace.truncated_by_cycle,
                    paths_truncated_by_limit: trace.truncated_by_limit,
                },
            );
        }

        let summary = Self::summarize(&packages);
        let graph_issues = Self::graph_issues(ctx.graph);
        let recommendations = Self::recommendations(&packages, &graph_issues, &skipped);

        AnalysisReport {
            metadata: ReportMetadata {
                tool_name: TOOL_NAME.to_string(),
                tool_version: env!("CARGO_PKG_VERSION").to_string(),
                run_id: ctx.run_id,
                generated_at: ctx.started_at,
                root_project: ctx.graph.root().name().to_string(),
                ecosystem: ctx.graph.root().ecosystem.clone(),
                degradation_level: level,
                package_count: packages.len(),
                stages: ctx
                    .results
                    .values()
                    .map(|r| StageSummary {
                        stage: r.stage,
                        success: r.success,
                        fallback_used: r.fallback_used,
                        duration_ms: r.duration.as_millis() as u64,
                        error: r.error.as_ref().map(|e| e.to_string()),
                    })
                    .collect(),
            },
            summary,
            packages,
            recommendations,
            degradation: Degradation { level, skipped },
            graph_issues,
        }
    }

    fn summarize(packages: &BTreeMap<String, PackageReport>) -> ReportSummary {
        let mut by_severity = SeverityCounts::default();
        let mut summary = ReportSummary {
            total_packages: packages.len(),
            ..Default::default()
        };

        for (key, package) in packages {
            package
                .vulnerabilities
                .iter()
                .for_each(|v| by_severity.record(v.severity));
            package
                .findings
                .iter()
                .filter(|f| f.finding_type != FindingType::KnownVulnerability)
                .for_each(|f| by_severity.record(f.severity));

            if !package.vulnerabilities.is_empty() {
                summary.vulnerable_packages += 1;
            }
            if package
                .reputation
                .as_ref()
                .is_some_and(|r| r.composite < HIGH_RISK_THRESHOLD)
            {
                summary.low_reputation_packages += 1;
            }
            if package.risk_score > summary.overall_risk {
                summary.overall_risk = package.risk_score;
                summary.highest_risk_package = Some(key.clone());
            }
        }

        summary.by_severity = by_severity;
        summary
    }

    fn graph_issues(graph: &DependencyGraph) -> GraphIssues {
        let render = |path: &[PackageId]| path.iter().map(|p| p.to_string()).collect::<Vec<_>>();
        GraphIssues {
            cycles: graph.cycles().iter().map(|c| render(&c.nodes)).collect(),
            conflicts: graph
                .conflicts()
                .values()
                .map(|c| ConflictIssue {
                    name: c.name.clone(),
                    versions: c
                        .versions
                        .iter()
                        .map(|(v, paths)| (v.clone(), paths.iter().map(|p| render(p)).collect()))
                        .collect(),
                })
                .collect(),
            unresolved: graph
                .unresolved()
                .iter()
                .filter_map(|id| graph.node(id))
                .map(|node| UnresolvedIssue {
                    package: node.id.name().to_string(),
                    requested_range: node.requested_range.clone(),
                    reason: match &node.status {
                        ResolutionStatus::Unresolved { reason } => reason.clone(),
                        ResolutionStatus::Resolved => String::new(),
                    },
                })
                .collect(),
        }
    }

    fn recommendations(
        packages: &BTreeMap<String, PackageReport>,
        issues: &GraphIssues,
        skipped: &[SkippedAnalysis],
    ) -> Vec<String> {
        let mut out = Vec::new();
        // Same advice for several packages is listed once, naming all of them
        let mut grouped: Vec<((String, String), Vec<String>)> = Vec::new();

        for package in packages.values() {
            let id = &package.id;
            for vuln in &package.vulnerabilities {
                out.push(match &vuln.fixed_version {
                    Some(fixed) => format!("Upgrade {} to {} or later to fix {}", id.name(), fixed, vuln.id),
                    None => format!("Review {}: {} has no published fix", id, vuln.id),
                });
            }
            for finding in &package.findings {
                let (subject, prefix, suffix) = match &finding.finding_type {
                    FindingType::KnownVulnerability => continue,
                    FindingType::MaliciousCode => (
                        id.to_string(),
                        "Remove packages matching a known malicious pattern: ",
                        String::new(),
                    ),
                    FindingType::Typosquatting => (
                        id.name().to_string(),
                        "Confirm these are the intended packages, not look-alikes of popular ones: ",
                        String::new(),
                    ),
                    FindingType::InstallScript => (
                        id.to_string(),
                        "Audit install scripts before installing: ",
                        String::new(),
                    ),
                    FindingType::LowReputation => (
                        id.name().to_string(),
                        "Verify provenance before relying on: ",
                        String::new(),
                    ),
                    FindingType::SupplyChainPattern => (
                        id.name().to_string(),
                        "Pin to a reviewed version until recent release activity is explained: ",
                        String::new(),
                    ),
                    FindingType::Other(label) => (id.to_string(), "Review ", format!(" ({})", label)),
                };
                let advice = (prefix.to_string(), suffix);
                match grouped.iter_mut().find(|(key, _)| *key == advice) {
                    Some((_, subjects)) => {
                        if !subjects.contains(&subject) {
                            subjects.push(subject);
                        }
                    }
                    None => grouped.push((advice, vec![subject])),
                }
            }
        }
        for ((prefix, suffix), subjects) in grouped {
            out.push(format!("{}{}{}", prefix, subjects.join(", "), suffix));
        }

        for conflict in &issues.conflicts {
            let versions: Vec<&str> = conflict.versions.keys().map(String::as_str).collect();
            out.push(format!(
                "Align {} on a single version (found {})",
                conflict.name,
                versions.join(", ")
            ));
        }
        if !issues.unresolved.is_empty() {
            let names: Vec<&str> = issues.unresolved.iter().map(|u| u.package.as_str()).collect();
            out.push(format!(
                "Check the declared ranges of packages that could not be resolved: {}",
                names.join(", ")
            ));
        }
        for skip in skipped {
            out.push(format!(
                "Re-run the analysis once {} analysis is available; this report used {}",
                skip.stage, skip.fallback
            ));
        }

        Self::dedupe(out)
    }

    /// Removes duplicates after whitespace and case normalisation, keeping first occurrences
    pub fn dedupe(recommendations: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        recommendations
            .into_iter()
            .filter(|r| {
                let normalized = r
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase();
                seen.insert(normalized)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::domain::{
        DeclaredType, DependencyNode, Ecosystem, PackageVulnerabilities, ReputationPayload,
        ReputationScore, Severity, StageError, StagePayload, Vulnerability, VulnerabilityPayload,
    };
    use crate::analysis::services::GraphAnalysis;
    use chrono::Utc;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use uuid::Uuid;

    fn id(name: &str, version: &str) -> PackageId {
        PackageId::new(Ecosystem::Npm, name, version).unwrap()
    }

    fn sample_graph() -> DependencyGraph {
        let root = id("app", "root");
        let a = id("a", "1.0.0");
        let b = id("b", "1.0.0");
        let mut nodes = BTreeMap::new();
        for (node, children) in [(&root, vec![a.clone()]), (&a, vec![b.clone()]), (&b, vec![])] {
            nodes.insert(
                node.clone(),
                DependencyNode {
                    id: node.clone(),
                    declared_type: DeclaredType::Direct,
                    depth: 0,
                    children,
                    status: ResolutionStatus::Resolved,
                    requested_range: None,
                },
            );
        }
        GraphAnalysis::assemble(root, nodes)
    }

    fn vuln_payload() -> StagePayload {
        let mut payload = VulnerabilityPayload {
            source: "test".to_string(),
            ..Default::default()
        };
        payload.packages.insert(
            id("b", "1.0.0").key(),
            PackageVulnerabilities::new(vec![Vulnerability::new(
                "GHSA-1".into(),
                None,
                Severity::High,
                Some("1.0.1".into()),
                None,
            )
            .unwrap()]),
        );
        StagePayload::Vulnerability(payload)
    }

    fn reputation_payload() -> StagePayload {
        let mut payload = ReputationPayload::default();
        for pkg in [id("a", "1.0.0"), id("b", "1.0.0")] {
            payload
                .packages
                .insert(pkg.key(), ReputationScore::neutral(pkg, "x", "y"));
        }
        StagePayload::Reputation(payload)
    }

    #[test]
    fn test_synthesize_groups_by_package() {
        let graph = sample_graph();
        let results: BTreeMap<StageName, StageResult> = [vuln_payload(), reputation_payload()]
            .into_iter()
            .map(|p| (p.stage(), StageResult::succeeded(p, Duration::from_millis(5))))
            .collect();
        let triggered = BTreeSet::new();
        let ctx = StageContext {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            graph: &graph,
            findings: &[],
            results: &results,
            triggered: &triggered,
        };

        let report = ReportSynthesizer::synthesize(&ctx);

        assert_eq!(report.packages.len(), 2);
        let b = &report.packages["npm:b:1.0.0"];
        assert_eq!(b.vulnerabilities.len(), 1);
        assert!((b.risk_score - 0.8).abs() < 1e-9);
        assert_eq!(b.dependency_paths, vec![vec!["a@1.0.0".to_string(), "b@1.0.0".to_string()]]);
        assert_eq!(report.summary.vulnerable_packages, 1);
        assert_eq!(report.summary.by_severity.high, 1);
        assert_eq!(report.summary.highest_risk_package.as_deref(), Some("npm:b:1.0.0"));
        assert_eq!(report.degradation.level, DegradationLevel::Complete);
        assert!(report
            .recommendations
            .contains(&"Upgrade b to 1.0.1 or later to fix GHSA-1".to_string()));
    }

    #[test]
    fn test_reduced_report_uses_successful_results_only() {
        let graph = sample_graph();
        let mut results = BTreeMap::new();
        results.insert(
            StageName::Vulnerability,
            StageResult::failed(
                StageName::Vulnerability,
                StageError::Timeout { timeout_ms: 10 },
                vuln_payload(),
                Duration::from_millis(10),
                true,
            ),
        );
        let rep = reputation_payload();
        results.insert(rep.stage(), StageResult::succeeded(rep, Duration::ZERO));
        let triggered = BTreeSet::new();
        let ctx = StageContext {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            graph: &graph,
            findings: &[],
            results: &results,
            triggered: &triggered,
        };

        let report = ReportSynthesizer::reduced(&ctx, "synthesis timed out");

        assert_eq!(report.degradation.level, DegradationLevel::Minimal);
        assert!(report.packages["npm:b:1.0.0"].vulnerabilities.is_empty());
        assert!(report.packages["npm:b:1.0.0"].reputation.is_some());
        let stages: Vec<StageName> = report.degradation.skipped.iter().map(|s| s.stage).collect();
        assert_eq!(stages, vec![StageName::Vulnerability, StageName::Synthesis]);
    }

    #[test]
    fn test_same_advice_is_grouped_across_packages() {
        let graph = sample_graph();
        let results = BTreeMap::new();
        let triggered = BTreeSet::new();
        let findings: Vec<Finding> = [id("a", "1.0.0"), id("b", "1.0.0")]
            .into_iter()
            .map(|pkg| Finding::new(pkg, FindingType::InstallScript, Severity::Medium, 0.8, vec![]))
            .collect();
        let ctx = StageContext {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            graph: &graph,
            findings: &findings,
            results: &results,
            triggered: &triggered,
        };

        let report = ReportSynthesizer::synthesize(&ctx);

        let install: Vec<&String> = report
            .recommendations
            .iter()
            .filter(|r| r.starts_with("Audit install scripts"))
            .collect();
        assert_eq!(
            install,
            vec!["Audit install scripts before installing: a@1.0.0, b@1.0.0"]
        );
    }

    #[test]
    fn test_dedupe_normalizes_whitespace_and_case() {
        let deduped = ReportSynthesizer::dedupe(vec![
            "Upgrade  lodash".to_string(),
            "upgrade lodash".to_string(),
            "Remove evil".to_string(),
        ]);
        assert_eq!(deduped, vec!["Upgrade  lodash".to_string(), "Remove evil".to_string()]);
    }
}
