/// Default SQLite database file
pub const DEFAULT_DATABASE_PATH: &str = "products.db";

/// Default CSV file consumed by the loader
pub const DEFAULT_CSV_PATH: &str = "products.csv";

/// Number of CSV rows inserted per transaction
pub const DEFAULT_BATCH_SIZE: usize = 1000;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;

/// Wildcard origin: any origin is allowed
pub const ANY_ORIGIN: &str = "*";

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Seconds to wait for a pooled connection before failing the request
pub const ACQUIRE_TIMEOUT_SECS: u64 = 30;

/// Number of rows returned by the "top N" aggregate queries
pub const TOP_N: i64 = 5;

/// Columns the product CSV must carry
pub const REQUIRED_CSV_COLUMNS: [&str; 9] = [
    "id",
    "cost",
    "category",
    "name",
    "brand",
    "retail_price",
    "department",
    "sku",
    "distribution_center_id",
];
