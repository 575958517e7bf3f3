pub mod builder;
pub mod index;

pub use builder::IndexNode;
pub use index::{StaticIndex, TypeFilter, ANY_TYPE};
