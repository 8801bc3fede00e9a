//! Code review agent: an LLM drives read-only git, GitHub and shell tools
//! through a sandbox, and a terminal renderer shows its progress.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐  events   ┌─────────────┐
//! │ agent-core  │ ────────▶ │  Renderer   │
//! └──────┬──────┘           └─────────────┘
//!        │ ToolHost
//! ┌──────┴──────┐  ApprovedCommand  ┌─────────────────┐
//! │ToolRegistry │ ────────────────▶ │ ExecutionEngine │
//! └─────────────┘                   └─────────────────┘
//! ```

pub mod build_info;
pub mod cli;
pub mod config;
pub mod core;
pub mod render;

pub use config::Config;
pub use crate::core::{Error, Result};
