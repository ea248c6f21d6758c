// crates/member-gateway-config/src/lib.rs
// ============================================================================
// Module: Member Gateway Config Library
// Description: Canonical config model, validation, and example generation.
// Purpose: Single source of truth for member-gateway.toml semantics.
// Dependencies: serde, toml, url
// ============================================================================

//! ## Overview
//! `member-gateway-config` defines the configuration model for the member
//! gateway. Loading is strict and fail-closed: unknown adapter types, missing
//! URLs, and zero-sized limits are rejected before any socket is opened.
//!
//! Security posture: config inputs are untrusted and may carry secrets; the
//! `Debug` output of secret-bearing fields is redacted.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
