pub mod cli;
pub mod config;
pub mod enrich;
pub mod extract;
pub mod fetcher;
pub mod pool;
pub mod record;
pub mod scheduler;
pub mod store;

pub use config::{AppConfig, ConfigError, FetchMode};
pub use enrich::{enrich, EnrichPolicy};
pub use fetcher::{normalize_website_url, BrowserFetcher, HttpFetcher, PageFetcher};
pub use pool::SessionPool;
pub use record::{Company, ContactInfo, ContactRecord, Person};
pub use scheduler::{RunStats, Scheduler};
pub use store::{Dataset, StoreError};
