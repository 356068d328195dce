pub mod client;
pub mod generation;
pub mod payload;
pub mod types;

pub use client::FalHttpClient;
pub use generation::FalGenerationClient;
