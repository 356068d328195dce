//! Generation task adapter for fal.ai and Kie AI
//!
//! Submits image-edit, multi-reference and video requests to either provider,
//! polls the remote task until it settles, and normalizes the output into one
//! result shape regardless of which provider produced it.

pub mod ai;
pub mod app;
pub mod error;
pub mod models;

pub use error::{Error, Result};
