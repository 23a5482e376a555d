pub mod loader;
pub mod schema;

pub use loader::{ConfigLoader, ConfigOverrides};
pub use schema::{ArchiveErrorPolicy, RunConfig, Verbosity};
