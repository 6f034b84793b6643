//! HTTP client plus the worker poll/resolve/compute/submit loop.

pub mod client;
pub mod worker;

pub use client::OrchestratorClient;
pub use worker::Worker;
