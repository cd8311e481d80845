//! OpenAI-compatible chat completion client for Halluguard.
//!
//! [`OpenAiClient`] implements [`halluguard_core::ModelClient`] over
//! `POST {api_base}/chat/completions` with bearer authentication. Transient
//! failures (rate limits, 5xx, network errors, timeouts) are retried inside
//! the client before a [`halluguard_core::ClientError`] is reported.

pub mod client;
pub mod config;
pub mod wire;

pub use client::OpenAiClient;
pub use config::OpenAiConfig;
