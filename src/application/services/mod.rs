/// Application services: stateful, async collaborators built on the domain
pub mod cache_manager;
mod dependency_graph_builder;
mod reputation_scorer;

pub use cache_manager::{CacheManager, CacheStats};
pub use dependency_graph_builder::{DependencyGraphBuilder, MAX_GRAPH_DEPTH};
pub use reputation_scorer::{ReputationScorer, ScoredPackage};
