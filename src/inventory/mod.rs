mod selector;

pub use selector::{select, series_pattern, Selection};
