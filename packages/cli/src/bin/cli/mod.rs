pub mod data;
pub mod stats;
pub mod utils;
