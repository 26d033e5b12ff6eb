//! Tool functions the agents expose to the model.
//!
//! Every tool answers with text meant for the end user. Failures of any
//! kind (bad arguments, API errors, transport problems) become text too;
//! nothing here returns an error to the agent loop.

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use super::client::{ApiReply, ClientError};
use super::model::ToolDefinition;

pub mod milk;
pub mod todo;

pub use milk::MilkTools;
pub use todo::TodoTools;

pub const AUTH_FAILED: &str = "Authentication failed. Please check API credentials.";

/// A named set of tools backed by the ledger API
#[async_trait]
pub trait Toolset: Send + Sync {
    /// Declarations sent to the model with every request
    fn definitions(&self) -> Vec<ToolDefinition>;

    /// Runs one tool with the model's JSON-encoded arguments
    async fn call(&self, name: &str, arguments: &str) -> String;
}

type ToolResult = Result<String, String>;

pub(crate) fn parse_args<T: DeserializeOwned>(tool: &str, arguments: &str) -> Result<T, String> {
    let raw = if arguments.trim().is_empty() {
        "{}"
    } else {
        arguments
    };
    serde_json::from_str(raw).map_err(|e| format!("Invalid arguments for {}: {}", tool, e))
}

pub(crate) fn unknown_tool(name: &str) -> String {
    format!("Unknown tool: {}", name)
}

fn transport_failure(action: &'static str) -> impl Fn(ClientError) -> String {
    move |e| format!("Error {}: {}", action, e)
}

/// Decodes a successful reply, or describes the failure
fn success_body<T: DeserializeOwned>(reply: &ApiReply, action: &str) -> Result<T, String> {
    if !reply.is_success() {
        return Err(format!(
            "Error {}: server returned {} ({})",
            action,
            reply.status,
            reply.error_message()
        ));
    }
    reply
        .json()
        .map_err(|e| format!("Error {}: unexpected response ({})", action, e))
}
