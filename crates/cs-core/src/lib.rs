//! crowdstage/crates/cs-core/src/lib.rs
//!
//! Domain models, ports and settings shared by every Crowdstage crate.

pub mod error;
pub mod models;
pub mod random;
pub mod settings;
pub mod traits;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use random::*;
pub use settings::*;
pub use traits::*;
