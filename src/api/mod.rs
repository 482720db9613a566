pub mod nominatim;
pub mod overpass;

pub use nominatim::geocode;
pub use overpass::{Element, Member, OverpassClient, OverpassResponse};
