// crates/toolgate-tools/src/registry.rs
// ============================================================================
// Module: Built-in Tool Registry
// Description: Assembles configured built-in tools into a tool registry.
// Purpose: Map `[tools]` configuration onto registered descriptors.
// Dependencies: toolgate-mcp, toolgate-config
// ============================================================================

//! ## Overview
//! [`build_registry`] registers the built-in tools selected by
//! `tools.enabled`. An empty list selects every built-in whose settings are
//! present; tools that need settings (`get_cloud_version`,
//! `summarize_csv_file`) are skipped when unconfigured. Naming a tool
//! explicitly makes it mandatory: unknown or unconfigured names fail startup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use thiserror::Error;
use toolgate_config::ToolsConfig;
use toolgate_mcp::RegistryError;
use toolgate_mcp::ToolDescriptor;
use toolgate_mcp::ToolRegistry;

use crate::cloud::CLOUD_VERSION;
use crate::cloud::CloudVersionTool;
use crate::csv::CSV_SUMMARY;
use crate::csv::CsvSummaryTool;
use crate::energy;
use crate::energy::ENERGY_REPORT;
use crate::greeting;
use crate::greeting::HELLO_WORLD;
use crate::math;
use crate::math::MATH_TOOLS;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Every built-in tool name, in default registration order.
pub const BUILTIN_TOOLS: &[&str] = &[
    "add_numbers",
    "subtract_numbers",
    "multiply_numbers",
    "divide_numbers",
    "power",
    "square_root",
    "factorial",
    HELLO_WORLD,
    ENERGY_REPORT,
    CLOUD_VERSION,
    CSV_SUMMARY,
];

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Built-in tool assembly errors.
#[derive(Debug, Error)]
pub enum ToolsError {
    /// `tools.enabled` names a tool that does not exist.
    #[error("unknown built-in tool: {0}")]
    UnknownTool(String),
    /// An explicitly enabled tool is missing a required setting.
    #[error("tool {name} requires {setting}")]
    Unavailable {
        /// Tool name.
        name: String,
        /// Missing config key.
        setting: &'static str,
    },
    /// The outbound HTTP client could not be built.
    #[error("tool http client error: {0}")]
    Client(String),
    /// Descriptor registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

// ============================================================================
// SECTION: Assembly
// ============================================================================

/// Builds a registry holding the configured built-in tools.
///
/// # Errors
///
/// Returns [`ToolsError`] when `tools.enabled` names an unknown or
/// unconfigured tool, or a descriptor is rejected.
pub fn build_registry(config: &ToolsConfig) -> Result<ToolRegistry, ToolsError> {
    let mut registry = ToolRegistry::new();
    register_builtin_tools(&mut registry, config)?;
    Ok(registry)
}

/// Registers the configured built-in tools into an existing registry.
///
/// # Errors
///
/// Returns [`ToolsError`] as for [`build_registry`], including duplicate
/// names already present in `registry`.
pub fn register_builtin_tools(
    registry: &mut ToolRegistry,
    config: &ToolsConfig,
) -> Result<(), ToolsError> {
    let explicit = !config.enabled.is_empty();
    let selected: Vec<&str> = if explicit {
        config.enabled.iter().map(|name| name.trim()).collect()
    } else {
        BUILTIN_TOOLS.to_vec()
    };
    for name in selected {
        match builtin_descriptor(name, config)? {
            Some(descriptor) => registry.register(descriptor)?,
            None if explicit => {
                return Err(ToolsError::Unavailable {
                    name: name.to_string(),
                    setting: required_setting(name),
                });
            }
            None => tracing::debug!(tool = name, "built-in tool not configured; skipped"),
        }
    }
    tracing::debug!(tools = registry.len(), "built-in tools registered");
    Ok(())
}

/// Builds one built-in descriptor, or `None` when its settings are absent.
fn builtin_descriptor(
    name: &str,
    config: &ToolsConfig,
) -> Result<Option<ToolDescriptor>, ToolsError> {
    let descriptor = match name {
        HELLO_WORLD => greeting::descriptor()?,
        ENERGY_REPORT => energy::descriptor()?,
        CLOUD_VERSION => {
            let Some(url) = &config.cloud_version_url else {
                return Ok(None);
            };
            CloudVersionTool::new(url.clone(), config.http_timeout())?.into_descriptor()?
        }
        CSV_SUMMARY => {
            let Some(dir) = &config.data_dir else {
                return Ok(None);
            };
            CsvSummaryTool::new(PathBuf::from(dir)).into_descriptor()?
        }
        other if MATH_TOOLS.contains(&other) => math::descriptor(other)?,
        other => return Err(ToolsError::UnknownTool(other.to_string())),
    };
    Ok(Some(descriptor))
}

/// Config key a settings-dependent tool needs.
fn required_setting(name: &str) -> &'static str {
    if name == CLOUD_VERSION { "tools.cloud_version_url" } else { "tools.data_dir" }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
