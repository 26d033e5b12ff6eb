use std::collections::VecDeque;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};

use super::model::{ChatMessage, ChatModel, ChatRequest, ModelError};
use super::tools::Toolset;

pub const MILK_INSTRUCTIONS: &str = "\
You are a helpful Milk Tracking Assistant that helps users manage milk collection records from suppliers.

You can:
1. Add milk entries for a supplier with a date and liters. If no date is given, use today's date.
2. List milk entries, optionally filtered by a start and/or end date.
3. Produce monthly payment reports with totals per supplier and grand totals.
4. List suppliers, add new suppliers (name, milk type cow or buffalo, rate) and update supplier rates.

Be concise. Always use the tools to read or change data, and confirm actions once they are done.
Show liters and amounts with 2 decimal places. Rates are in Rs. per liter and amounts are liters * rate_per_liter.
Use YYYY-MM-DD for dates when calling tools, but accept natural language such as \"today\" or \"yesterday\" from the user.
Supplier names must match exactly as registered. If a tool reports an error, explain it and suggest what to do next.";

pub const TODO_INSTRUCTIONS: &str = "\
You are a helpful Todo Assistant that helps users manage their tasks.

You can list todos, show one todo by ID, create todos with a title and optional description,
update a todo's title, description or completion status, mark todos complete or incomplete, and delete todos.

When users ask about their tasks, start by listing the current todos to give context.
Be concise. Confirm what was created or changed, and be encouraging when tasks get done.
Always use the tools to read or change todos. If a tool reports an error, explain it and suggest alternatives.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("model request failed: {0}")]
    Model(#[from] ModelError),
    #[error("no final answer after {0} tool rounds")]
    TooManyToolRounds(usize),
}

/// Earlier user and assistant turns of one chat session, oldest first.
///
/// Only the final text of each turn is kept; tool traffic is not replayed.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: VecDeque<(String, String)>,
    max_turns: usize,
}

impl Conversation {
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns,
        }
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Appends a finished exchange, dropping the oldest past the limit
    pub fn record(&mut self, user: &str, assistant: &str) {
        if self.max_turns == 0 {
            return;
        }
        self.turns.push_back((user.to_string(), assistant.to_string()));
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.turns
            .iter()
            .flat_map(|(user, assistant)| {
                [ChatMessage::user(user.as_str()), ChatMessage::assistant(assistant.as_str())]
            })
            .collect()
    }
}

/// Instructions, a model and a toolset driven in a tool-calling loop
pub struct Agent {
    name: String,
    instructions: String,
    model: Arc<dyn ChatModel>,
    tools: Arc<dyn Toolset>,
    max_tool_rounds: usize,
}

impl Agent {
    pub fn new(
        name: &str,
        instructions: &str,
        model: Arc<dyn ChatModel>,
        tools: Arc<dyn Toolset>,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            name: name.to_string(),
            instructions: instructions.to_string(),
            model,
            tools,
            max_tool_rounds,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Answers one user message with no prior context
    pub async fn run(&self, input: &str) -> Result<String, AgentError> {
        self.respond(&[], input, None).await
    }

    /// Answers the next message of `conversation` and records the exchange.
    ///
    /// With `deltas` set, model text is forwarded as it streams in.
    pub async fn run_turn(
        &self,
        conversation: &mut Conversation,
        input: &str,
        deltas: Option<mpsc::Sender<String>>,
    ) -> Result<String, AgentError> {
        let answer = self
            .respond(&conversation.messages(), input, deltas)
            .await?;
        conversation.record(input, &answer);
        Ok(answer)
    }

    /// Each round sends the whole conversation so far. Tool calls requested
    /// by the model are executed in order and their results appended as
    /// `tool` messages before the next round.
    #[instrument(skip_all, fields(agent = %self.name, history = history.len()))]
    async fn respond(
        &self,
        history: &[ChatMessage],
        input: &str,
        deltas: Option<mpsc::Sender<String>>,
    ) -> Result<String, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage::system(self.instructions.clone()));
        messages.extend_from_slice(history);
        messages.push(ChatMessage::user(input));
        let mut request = ChatRequest {
            messages,
            tools: self.tools.definitions(),
        };

        for round in 0..=self.max_tool_rounds {
            let reply = match &deltas {
                Some(tx) => self.model.stream(&request, tx.clone()).await?,
                None => self.model.complete(&request).await?,
            }
            .message;
            let calls = reply.requested_tool_calls().to_vec();

            if calls.is_empty() {
                debug!(round, "final answer received");
                return Ok(reply.content.unwrap_or_default());
            }
            if round == self.max_tool_rounds {
                break;
            }

            request.messages.push(reply);
            for call in calls {
                info!(tool = %call.function.name, "tool requested");
                let output = self
                    .tools
                    .call(&call.function.name, &call.function.arguments)
                    .await;
                request.messages.push(ChatMessage::tool(call.id, output));
            }
        }

        warn!(max = self.max_tool_rounds, "tool round limit reached");
        Err(AgentError::TooManyToolRounds(self.max_tool_rounds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::model::{ChatResponse, FunctionCall, Role, ToolCall, ToolDefinition};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Replays canned replies and records every request it sees
    struct ScriptedModel {
        replies: Mutex<Vec<ChatMessage>>,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl ScriptedModel {
        fn new(mut replies: Vec<ChatMessage>) -> Self {
            replies.reverse();
            Self {
                replies: Mutex::new(replies),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, ModelError> {
            self.seen.lock().unwrap().push(request.clone());
            let message = self
                .replies
                .lock()
                .unwrap()
                .pop()
                .unwrap_or_else(|| ChatMessage::assistant("out of script"));
            Ok(ChatResponse { message })
        }
    }

    struct EchoTools;

    #[async_trait]
    impl Toolset for EchoTools {
        fn definitions(&self) -> Vec<ToolDefinition> {
            vec![ToolDefinition::function(
                "echo",
                "Echo the arguments",
                json!({"type": "object"}),
            )]
        }

        async fn call(&self, name: &str, arguments: &str) -> String {
            format!("{} <- {}", name, arguments)
        }
    }

    fn tool_request(id: &str) -> ChatMessage {
        ChatMessage {
            role: Role::Assistant,
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: id.to_string(),
                kind: "function".to_string(),
                function: FunctionCall {
                    name: "echo".to_string(),
                    arguments: r#"{"x":1}"#.to_string(),
                },
            }]),
            tool_call_id: None,
        }
    }

    #[tokio::test]
    async fn feeds_tool_results_back_until_final_answer() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_request("call_1"),
            ChatMessage::assistant("done"),
        ]));
        let agent = Agent::new("test", "be brief", model.clone(), Arc::new(EchoTools), 4);

        let answer = agent.run("hi").await.unwrap();
        assert_eq!(answer, "done");

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].messages[0].role, Role::System);
        assert_eq!(seen[0].tools.len(), 1);

        let last = seen[1].messages.last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert_eq!(last.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(last.content.as_deref(), Some(r#"echo <- {"x":1}"#));
    }

    #[tokio::test]
    async fn stops_after_the_round_limit() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_request("a"),
            tool_request("b"),
            tool_request("c"),
        ]));
        let agent = Agent::new("test", "", model.clone(), Arc::new(EchoTools), 2);

        let err = agent.run("loop forever").await.unwrap_err();
        assert!(matches!(err, AgentError::TooManyToolRounds(2)));
        assert_eq!(model.seen.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn later_turns_see_earlier_ones() {
        let model = Arc::new(ScriptedModel::new(vec![
            ChatMessage::assistant("Green Valley supplies cow milk."),
            ChatMessage::assistant("Rs. 55.50 per liter."),
        ]));
        let agent = Agent::new("test", "be brief", model.clone(), Arc::new(EchoTools), 4);
        let mut conversation = Conversation::new(10);

        agent
            .run_turn(&mut conversation, "who supplies cow milk?", None)
            .await
            .unwrap();
        let answer = agent
            .run_turn(&mut conversation, "at what rate?", None)
            .await
            .unwrap();
        assert_eq!(answer, "Rs. 55.50 per liter.");
        assert_eq!(conversation.len(), 2);

        let seen = model.seen.lock().unwrap();
        let second: Vec<_> = seen[1]
            .messages
            .iter()
            .map(|m| (m.role, m.content.as_deref().unwrap_or_default()))
            .collect();
        assert_eq!(
            second,
            [
                (Role::System, "be brief"),
                (Role::User, "who supplies cow milk?"),
                (Role::Assistant, "Green Valley supplies cow milk."),
                (Role::User, "at what rate?"),
            ]
        );
    }

    #[tokio::test]
    async fn streamed_turn_forwards_text_and_runs_tools() {
        let model = Arc::new(ScriptedModel::new(vec![
            tool_request("call_1"),
            ChatMessage::assistant("all done"),
        ]));
        let agent = Agent::new("test", "", model.clone(), Arc::new(EchoTools), 4);
        let mut conversation = Conversation::new(10);

        let (tx, mut rx) = mpsc::channel(8);
        let answer = agent
            .run_turn(&mut conversation, "go", Some(tx))
            .await
            .unwrap();
        assert_eq!(answer, "all done");
        assert_eq!(rx.recv().await.as_deref(), Some("all done"));
        assert_eq!(rx.recv().await, None);
        assert_eq!(model.seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn conversation_keeps_only_the_latest_turns() {
        let mut conversation = Conversation::new(2);
        for i in 0..5 {
            conversation.record(&format!("q{}", i), &format!("a{}", i));
        }
        let contents: Vec<_> = conversation
            .messages()
            .into_iter()
            .map(|m| m.content.unwrap_or_default())
            .collect();
        assert_eq!(contents, ["q3", "a3", "q4", "a4"]);

        let mut disabled = Conversation::new(0);
        disabled.record("q", "a");
        assert!(disabled.is_empty());
    }
}
