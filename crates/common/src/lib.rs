//! Common utilities and types shared across Authly components.

#![warn(clippy::pedantic)]

/// Module for common configuration
pub mod config;

/// Module for JWT utilities (size limits, segment decoding, temporal claims)
pub mod jwt;
