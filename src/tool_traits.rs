//! Type-safe external tool contracts.
//!
//! Every external tool call (mount utility, config builder, validator) is a
//! struct implementing `ToolInvocation`. The struct is the contract: flag
//! names are produced in one place and the runner never builds argument
//! vectors by hand.

use std::path::Path;

/// Trait for typed external tool invocations.
///
/// # Contract
///
/// - `program()`: path (or PATH-resolved name) of the executable
/// - `to_cli_args()`: arguments exactly as the tool expects them
/// - `get_env_vars()`: extra environment for the child, empty by default
/// - `tool_name()`: short label used in logs and `ExternalToolFailure`
pub trait ToolInvocation {
    fn program(&self) -> &Path;

    fn to_cli_args(&self) -> Vec<String>;

    fn get_env_vars(&self) -> Vec<(String, String)> {
        Vec::new()
    }

    fn tool_name(&self) -> String;
}
