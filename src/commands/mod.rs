//! CLI commands implementation

pub mod feed_store;
pub mod import;
pub mod init;
pub mod run;
pub mod stats;

pub use feed_store::*;
pub use import::*;
pub use init::*;
pub use run::*;
pub use stats::*;
