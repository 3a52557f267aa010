mod report;
mod runner;

pub use report::{ReportMode, ResearchReport};
pub use runner::{ResearchError, ResearchProgress, ResearchRunner};
