mod string;

pub use string::{fill_template, join_names};
