mod graph_analysis;
mod path_tracer;
mod report_schema;
mod report_synthesizer;
mod version_resolver;

pub use graph_analysis::GraphAnalysis;
pub use path_tracer::{MatchMode, PathTracer, TraceOutcome};
pub use report_schema::{ReportSchema, REQUIRED_SECTIONS};
pub use report_synthesizer::{ReportSynthesizer, TOOL_NAME};
pub use version_resolver::VersionResolver;
