pub mod location;
pub mod pipeline;
pub mod scoring;
pub mod selector;
pub mod skills;
pub mod synonyms;
pub mod weights;

pub use pipeline::{
    EngineError, JobRecommendation, MatchingEngine, MatchingEngineConfig, Recommendations,
    TalentRecommendation,
};
pub use scoring::{ComponentScores, MatchExplanation, MatchResult, Ranker, RankerConfig};
pub use selector::{Page, PoolFilter, RankedPage, TopNSelector};
pub use synonyms::SynonymTable;
pub use weights::Weights;
