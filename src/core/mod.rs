pub mod types;
pub mod constants;
pub mod fields;

pub use types::*;
pub use constants::*;
