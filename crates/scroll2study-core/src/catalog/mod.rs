//! Video catalog: subjects, complexity levels, videos, and the grid index
//! that maps each (subject, level) cell to its video.

mod index;
mod types;

pub use index::{DuplicatePolicy, GridIndex};
pub use types::{Catalog, CatalogItem, ComplexityLevel, Subject};
