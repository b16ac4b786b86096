// ABOUTME: Core types and utilities for the catalog API
// ABOUTME: Configuration, pagination contract and pricing math shared by every package

pub mod config;
pub mod constants;
pub mod pagination;
pub mod utils;

// Re-export configuration
pub use config::{Config, ConfigError};

// Re-export pagination types
pub use pagination::{PaginationMeta, PaginationParams};

// Re-export utilities
pub use utils::{profit_margin, profit_margin_percentage, round2};
