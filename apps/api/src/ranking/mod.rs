//! Ranking Engine: composite semantic + structured-feature scoring.

pub mod engine;
pub mod features;
pub mod render;

pub use engine::RankingEngine;
pub use render::screening_markdown;
