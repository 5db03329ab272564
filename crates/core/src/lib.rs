pub mod entities;
pub mod error;
pub mod intent;
pub mod models;
pub mod normalize;
pub mod pattern;
pub mod synthesis;

pub use entities::{
    detect_by_words, extract_from_phrase, resolve, resolve_with, EntityCatalog, EntityList,
};
pub use error::PipelineError;
pub use intent::{classify, extract_article_number, extract_keywords};
pub use models::*;
pub use normalize::{fold_diacritics, normalize, normalize_zone_name};
pub use pattern::LikePattern;
pub use synthesis::{degraded_envelope, synthesize};
