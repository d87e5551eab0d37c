pub mod dedup;
pub mod similarity;

pub use dedup::{MatchConfig, is_same_location, merge_all_categories, merge_similar_pois};
pub use similarity::{edit_distance, name_similarity, similarity_ratio, strip_line_prefix};
