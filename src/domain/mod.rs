pub mod category;
pub mod coords;
pub mod poi;

pub use category::Category;
pub use coords::Coordinates;
pub use poi::{PoiCandidate, RawPoi, Reading, TravelMode};
