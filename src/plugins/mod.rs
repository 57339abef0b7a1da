pub mod siege;

pub use siege::*;
