pub mod client;
pub mod generation;
pub mod payload;
pub mod types;

pub use client::KieHttpClient;
pub use generation::KieGenerationClient;
