// crates/toolgate-tools/src/lib.rs
// ============================================================================
// Module: Toolgate Tools
// Description: Built-in tools and registry assembly.
// Purpose: Provide ready-to-serve tools for the Toolgate gateway.
// Dependencies: toolgate-mcp, toolgate-config, reqwest, time
// ============================================================================

//! ## Overview
//! This crate ships the built-in tools (math, greeting, energy report, cloud
//! version, CSV summary) and [`build_registry`], which assembles the subset
//! selected by `[tools]` configuration into a [`toolgate_mcp::ToolRegistry`].
//! Handlers receive the authenticated caller explicitly and never see the
//! credential.
//! Security posture: tool arguments are untrusted even after schema
//! validation; file access is confined to the configured data directory.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod args;
pub mod cloud;
pub mod csv;
pub mod energy;
pub mod greeting;
pub mod math;
pub mod registry;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use cloud::CloudVersionTool;
pub use csv::CsvSummaryTool;
pub use registry::BUILTIN_TOOLS;
pub use registry::ToolsError;
pub use registry::build_registry;
