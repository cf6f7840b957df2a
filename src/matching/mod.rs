pub mod compare;
pub mod keywords;
pub mod matcher;
pub mod parts;
pub mod predictor;

pub use keywords::InstrumentKeywordSet;
pub use matcher::KeywordMatcher;
pub use parts::{assemble_parts, PartAssembly};
pub use predictor::{PagePrediction, PartPredictor, PredictorConfig};
