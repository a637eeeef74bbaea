// crates/toolgate-config/src/lib.rs
// ============================================================================
// Module: Toolgate Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for toolgate.toml semantics.
// Dependencies: serde, toml, url, base64
// ============================================================================

//! ## Overview
//! `toolgate-config` defines the canonical configuration model for the tool
//! gateway. It provides strict, fail-closed validation; every consumer
//! (server, tools, CLI) reads the same validated structure.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
