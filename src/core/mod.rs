//! Review logic shared by the binary and the integration tests.

mod error;
pub mod review;
pub mod sandbox;
pub mod tools;

pub use error::{Error, Result};
pub use review::{create_code_review_agent, run_review};
