mod marker;

pub use marker::{placeholder_marker, unresolved_markers};
