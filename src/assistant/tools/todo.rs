use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;
use std::sync::Arc;
use tracing::debug;

use super::{
    parse_args, success_body, transport_failure, unknown_tool, ToolResult, Toolset, AUTH_FAILED,
};
use crate::assistant::{
    client::{ApiReply, LedgerClient},
    model::ToolDefinition,
};
use crate::services::todos::{CreateTodo, TodoResponse, UpdateTodo};

#[derive(Debug, Deserialize)]
struct TodoIdArgs {
    todo_id: i64,
}

#[derive(Debug, Deserialize)]
struct CreateTodoArgs {
    title: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateTodoArgs {
    todo_id: i64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
}

fn status_label(todo: &TodoResponse) -> &'static str {
    if todo.completed {
        "completed"
    } else {
        "pending"
    }
}

fn not_found(todo_id: i64) -> String {
    format!("Todo with ID {} not found.", todo_id)
}

/// Answers 404 and 401 replies with their canned messages
fn early_answer(reply: &ApiReply, todo_id: i64) -> Option<String> {
    match reply.status {
        StatusCode::NOT_FOUND => Some(not_found(todo_id)),
        StatusCode::UNAUTHORIZED => Some(AUTH_FAILED.to_string()),
        _ => None,
    }
}

/// Todo list tools
pub struct TodoTools {
    client: Arc<LedgerClient>,
}

impl TodoTools {
    pub fn new(client: Arc<LedgerClient>) -> Self {
        Self { client }
    }

    async fn list_todos(&self) -> ToolResult {
        let reply = self
            .client
            .get(&["todos"], &[])
            .await
            .map_err(transport_failure("listing todos"))?;
        if reply.status == StatusCode::UNAUTHORIZED {
            return Ok(AUTH_FAILED.to_string());
        }

        let todos: Vec<TodoResponse> = success_body(&reply, "listing todos")?;
        if todos.is_empty() {
            return Ok("No todos found. The todo list is empty.".to_string());
        }

        let mut out = String::from("Current todos:\n");
        for todo in &todos {
            let desc = match todo.description.as_deref() {
                Some(d) if !d.is_empty() => format!(" - {}", d),
                _ => String::new(),
            };
            let _ = writeln!(
                out,
                "- [{}] {}{} ({})",
                todo.id,
                todo.title,
                desc,
                status_label(todo)
            );
        }
        Ok(out)
    }

    async fn get_todo(&self, args: TodoIdArgs) -> ToolResult {
        let id = args.todo_id.to_string();
        let reply = self
            .client
            .get(&["todos", &id], &[])
            .await
            .map_err(transport_failure("getting todo"))?;
        if let Some(answer) = early_answer(&reply, args.todo_id) {
            return Ok(answer);
        }

        let todo: TodoResponse = success_body(&reply, "getting todo")?;
        let desc = match todo.description.as_deref() {
            Some(d) if !d.is_empty() => format!("\nDescription: {}", d),
            _ => String::new(),
        };
        Ok(format!(
            "Todo #{}: {}{}\nStatus: {}",
            todo.id,
            todo.title,
            desc,
            status_label(&todo)
        ))
    }

    async fn create_todo(&self, args: CreateTodoArgs) -> ToolResult {
        let payload = CreateTodo {
            title: args.title,
            description: args.description.filter(|d| !d.is_empty()),
            completed: false,
        };
        let reply = self
            .client
            .post_json(&["todos"], &payload)
            .await
            .map_err(transport_failure("creating todo"))?;
        if reply.status == StatusCode::UNAUTHORIZED {
            return Ok(AUTH_FAILED.to_string());
        }

        let todo: TodoResponse = success_body(&reply, "creating todo")?;
        let desc = match todo.description.as_deref() {
            Some(d) if !d.is_empty() => format!(" with description: {}", d),
            _ => String::new(),
        };
        Ok(format!("Created todo #{}: '{}'{}", todo.id, todo.title, desc))
    }

    async fn update_todo(&self, args: UpdateTodoArgs) -> ToolResult {
        let patch = UpdateTodo {
            title: args.title,
            description: args.description,
            completed: args.completed,
        };
        if patch.is_empty() {
            return Ok(
                "No updates provided. Please specify at least one field to update.".to_string(),
            );
        }

        let todo = match self.patch(args.todo_id, &patch, "updating todo").await? {
            Ok(todo) => todo,
            Err(answer) => return Ok(answer),
        };
        Ok(format!(
            "Updated todo #{}: '{}' - Status: {}",
            todo.id,
            todo.title,
            status_label(&todo)
        ))
    }

    async fn set_completed(&self, todo_id: i64, completed: bool) -> ToolResult {
        let patch = UpdateTodo {
            completed: Some(completed),
            ..Default::default()
        };
        let todo = match self.patch(todo_id, &patch, "updating todo").await? {
            Ok(todo) => todo,
            Err(answer) => return Ok(answer),
        };
        if completed {
            Ok(format!("Marked todo #{} '{}' as completed!", todo.id, todo.title))
        } else {
            Ok(format!("Marked todo #{} '{}' as pending.", todo.id, todo.title))
        }
    }

    /// The updated todo, or the canned answer for a 404/401
    async fn patch(
        &self,
        todo_id: i64,
        patch: &UpdateTodo,
        action: &'static str,
    ) -> Result<Result<TodoResponse, String>, String> {
        let id = todo_id.to_string();
        let reply = self
            .client
            .patch_json(&["todos", &id], patch)
            .await
            .map_err(transport_failure(action))?;
        if let Some(answer) = early_answer(&reply, todo_id) {
            return Ok(Err(answer));
        }
        success_body(&reply, action).map(Ok)
    }

    async fn delete_todo(&self, args: TodoIdArgs) -> ToolResult {
        let id = args.todo_id.to_string();
        let reply = self
            .client
            .delete(&["todos", &id])
            .await
            .map_err(transport_failure("deleting todo"))?;
        if let Some(answer) = early_answer(&reply, args.todo_id) {
            return Ok(answer);
        }
        if !reply.is_success() {
            return Err(format!(
                "Error deleting todo: server returned {} ({})",
                reply.status,
                reply.error_message()
            ));
        }
        Ok(format!("Deleted todo #{} successfully.", args.todo_id))
    }
}

fn todo_id_schema(description: &str) -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "todo_id": {"type": "integer", "description": description}
        },
        "required": ["todo_id"]
    })
}

#[async_trait]
impl Toolset for TodoTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::function(
                "list_todos",
                "List all todos with their id, title, description and status.",
                json!({"type": "object", "properties": {}}),
            ),
            ToolDefinition::function(
                "get_todo",
                "Get a specific todo by its ID.",
                todo_id_schema("The ID of the todo to retrieve."),
            ),
            ToolDefinition::function(
                "create_todo",
                "Create a new todo item.",
                json!({
                    "type": "object",
                    "properties": {
                        "title": {"type": "string", "description": "The title of the todo (max 200 characters)."},
                        "description": {"type": "string", "description": "Optional description (max 1000 characters)."}
                    },
                    "required": ["title"]
                }),
            ),
            ToolDefinition::function(
                "update_todo",
                "Update the title, description or completion status of a todo.",
                json!({
                    "type": "object",
                    "properties": {
                        "todo_id": {"type": "integer", "description": "The ID of the todo to update."},
                        "title": {"type": "string"},
                        "description": {"type": "string"},
                        "completed": {"type": "boolean"}
                    },
                    "required": ["todo_id"]
                }),
            ),
            ToolDefinition::function(
                "mark_todo_complete",
                "Mark a todo as completed.",
                todo_id_schema("The ID of the todo to mark as complete."),
            ),
            ToolDefinition::function(
                "mark_todo_incomplete",
                "Mark a todo as pending.",
                todo_id_schema("The ID of the todo to mark as incomplete."),
            ),
            ToolDefinition::function(
                "delete_todo",
                "Delete a todo permanently.",
                todo_id_schema("The ID of the todo to delete."),
            ),
        ]
    }

    async fn call(&self, name: &str, arguments: &str) -> String {
        debug!(tool = name, "running todo tool");
        let result = match name {
            "list_todos" => self.list_todos().await,
            "get_todo" => match parse_args(name, arguments) {
                Ok(args) => self.get_todo(args).await,
                Err(e) => Err(e),
            },
            "create_todo" => match parse_args(name, arguments) {
                Ok(args) => self.create_todo(args).await,
                Err(e) => Err(e),
            },
            "update_todo" => match parse_args(name, arguments) {
                Ok(args) => self.update_todo(args).await,
                Err(e) => Err(e),
            },
            "mark_todo_complete" => match parse_args::<TodoIdArgs>(name, arguments) {
                Ok(args) => self.set_completed(args.todo_id, true).await,
                Err(e) => Err(e),
            },
            "mark_todo_incomplete" => match parse_args::<TodoIdArgs>(name, arguments) {
                Ok(args) => self.set_completed(args.todo_id, false).await,
                Err(e) => Err(e),
            },
            "delete_todo" => match parse_args(name, arguments) {
                Ok(args) => self.delete_todo(args).await,
                Err(e) => Err(e),
            },
            other => Err(unknown_tool(other)),
        };
        result.unwrap_or_else(|message| message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;

    fn offline_tools() -> TodoTools {
        let client = LedgerClient::with_http(Client::new(), "http://127.0.0.1:9", "a@b.c", "pw")
            .unwrap();
        TodoTools::new(Arc::new(client))
    }

    #[test]
    fn declares_the_seven_todo_tools() {
        assert_eq!(offline_tools().definitions().len(), 7);
    }

    #[tokio::test]
    async fn empty_update_is_refused_locally() {
        let answer = offline_tools().call("update_todo", r#"{"todo_id": 4}"#).await;
        assert_eq!(
            answer,
            "No updates provided. Please specify at least one field to update."
        );
    }

    #[tokio::test]
    async fn missing_id_is_reported() {
        let answer = offline_tools().call("get_todo", "{}").await;
        assert!(answer.starts_with("Invalid arguments for get_todo:"));
    }
}
