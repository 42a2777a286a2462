//! wanderlust-core: preference scoring and destination matching

pub mod destination;
pub mod extractor;
pub mod matcher;
pub mod quiz;
pub mod score_map;
pub mod session;
pub mod traits;

pub use destination::{Catalog, Destination};
pub use extractor::{default_rules, ExtractionRule, PreferenceExtractor};
pub use matcher::{
    match_destinations, score_destination, top_matches, DestinationMatch, MatchSummary,
    MAX_MATCH_PERCENT, MIN_MATCH_PERCENT,
};
pub use quiz::{Quiz, QuizOption, QuizQuestion};
pub use score_map::{ScoreMap, MAX_TRAIT_WEIGHT};
pub use session::{ResultsSnapshot, Session, SNAPSHOT_SIZE};
pub use traits::{trait_label, Dimension, TRAITS};
