use serde::{Deserialize, Serialize};

use crate::planning::SubQuery;

/// The output of a research run.
///
/// Holds the evidence body handed to the prediction engine together with
/// the provenance it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchReport {
    /// The question this report was researched for
    pub question: String,
    /// Synthesized prose, or labelled raw evidence (see `mode`)
    pub body: String,
    /// Source URLs of the retrieved chunks, in order of first appearance
    pub sources: Vec<String>,
    /// Search queries the planner produced
    pub sub_queries: Vec<SubQuery>,
    pub mode: ReportMode,
    /// Number of chunks the body was built from
    pub evidence_count: usize,
}

/// How the report body was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportMode {
    /// One model call condensed the evidence into prose.
    Synthesized,
    /// The retrieved chunk text itself, labelled with source URLs.
    RawEvidence,
}

impl ReportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::Synthesized => "synthesized",
            ReportMode::RawEvidence => "raw evidence",
        }
    }
}

impl ResearchReport {
    /// Converts the report to markdown format.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("# Research: {}\n\n", self.question));

        md.push_str("## Report\n\n");
        md.push_str(self.body.trim());
        md.push_str("\n\n");

        md.push_str("## Search Queries\n\n");
        for query in &self.sub_queries {
            md.push_str(&format!("- {}\n", query));
        }
        md.push('\n');

        md.push_str("## Sources\n\n");
        for source in &self.sources {
            md.push_str(&format!("- {}\n", source));
        }

        md
    }
}
