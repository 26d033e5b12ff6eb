//! Conversational front-end for the ledger API.
//!
//! An [`agent::Agent`] forwards free text to a chat model together with a
//! set of tool declarations; the tools call the HTTP API through
//! [`client::LedgerClient`] and report back in plain text. Interactive
//! sessions stream the answer and carry a bounded [`agent::Conversation`].

pub mod agent;
pub mod client;
pub mod config;
pub mod model;
pub mod tools;

use std::sync::Arc;

pub use self::agent::{Agent, AgentError, Conversation};
pub use self::client::{ApiReply, ClientError, LedgerClient};
pub use self::config::AssistantConfig;
pub use self::model::{select_model, ChatModel, FallbackModel, ModelError, OpenAiCompatModel};

/// Which assistant to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::EnumString, strum::Display)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AgentKind {
    Milk,
    Todo,
}

/// Builds the agent of the given kind on top of a shared client and model
pub fn build_agent(
    kind: AgentKind,
    cfg: &AssistantConfig,
    client: Arc<LedgerClient>,
    model: Arc<dyn ChatModel>,
) -> Agent {
    match kind {
        AgentKind::Milk => Agent::new(
            "MilkTrackingAgent",
            agent::MILK_INSTRUCTIONS,
            model,
            Arc::new(tools::MilkTools::new(client)),
            cfg.max_tool_rounds,
        ),
        AgentKind::Todo => Agent::new(
            "TodoAgent",
            agent::TODO_INSTRUCTIONS,
            model,
            Arc::new(tools::TodoTools::new(client)),
            cfg.max_tool_rounds,
        ),
    }
}
