//! Observability for the Authly API.
//!
//! Provides metrics definitions and recording helpers. Logging is set up in
//! `main` with `tracing-subscriber`.

pub mod metrics;
