pub mod env;
mod interface;

pub use interface::*;
