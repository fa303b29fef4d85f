//! Path equivalence between the origin and destination trees

pub mod compare;
pub mod mapping;

pub use compare::{are_equivalent, same_minute};
pub use mapping::equivalent_path;
