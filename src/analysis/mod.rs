//! Post-fetch analysis: chain detection and name-variation scoring.

mod report;
pub mod similarity;

pub use report::{analyze, AnalysisReport, NameVariation};
pub use similarity::{find_similar_names, similarity, SimilarName};
