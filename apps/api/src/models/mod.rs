pub mod candidate;
pub mod job;
pub mod lenient;
pub mod ranking_config;
pub mod screening;
pub mod session;

pub use candidate::{CandidateRecord, CandidateSummary, ExtractedResume};
pub use job::JobSnapshot;
pub use ranking_config::{Feature, RankingConfig, RankingConfigPatch};
pub use screening::{FeatureScore, RankedCandidate, ScreeningResult};
pub use session::{Message, Phase, Role, Session, SessionPatch, SessionSummary};
