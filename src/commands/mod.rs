pub mod generate;
pub mod niche;
pub mod upload;

// Re-export command functions for convenience
pub use generate::generate;
pub use niche::{init, list, status};
pub use upload::{schedule, upload};
