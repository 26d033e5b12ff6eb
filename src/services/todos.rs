use crate::{db::DbPool, entities::todo, errors::ServiceError};
use sea_orm::{ActiveModelTrait, EntityTrait, ModelTrait, QueryOrder, QuerySelect, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

/// Upper bound on `limit` for list requests
pub const MAX_PAGE_SIZE: u64 = 1000;

#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct CreateTodo {
    #[validate(length(min = 1, max = 200))]
    #[schema(example = "Collect feed invoice")]
    pub title: String,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: bool,
}

/// Partial update of a todo; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
pub struct UpdateTodo {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateTodo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.completed.is_none()
    }
}

/// Offset pagination for todo listings
#[derive(Debug, Clone, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TodoListParams {
    /// Number of todos to skip (default 0)
    #[serde(default)]
    pub skip: u64,
    /// Maximum number of todos to return (default 100, at most 1000)
    #[serde(default = "default_limit")]
    pub limit: u64,
}

impl Default for TodoListParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: default_limit(),
        }
    }
}

fn default_limit() -> u64 {
    100
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TodoResponse {
    pub id: i32,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

impl From<todo::Model> for TodoResponse {
    fn from(model: todo::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            completed: model.completed,
        }
    }
}

/// Service for the todo list
#[derive(Clone)]
pub struct TodoService {
    db_pool: Arc<DbPool>,
}

impl TodoService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self))]
    pub async fn create_todo(&self, input: CreateTodo) -> Result<TodoResponse, ServiceError> {
        let model = todo::ActiveModel {
            title: Set(input.title),
            description: Set(input.description),
            completed: Set(input.completed),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        info!(todo_id = model.id, "todo created");
        Ok(model.into())
    }

    #[instrument(skip(self))]
    pub async fn list_todos(&self, params: TodoListParams) -> Result<Vec<TodoResponse>, ServiceError> {
        let todos = todo::Entity::find()
            .order_by_asc(todo::Column::Id)
            .offset(params.skip)
            .limit(params.limit.min(MAX_PAGE_SIZE))
            .all(&*self.db_pool)
            .await?;

        Ok(todos.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(self))]
    pub async fn get_todo(&self, todo_id: i32) -> Result<TodoResponse, ServiceError> {
        self.find(todo_id).await.map(Into::into)
    }

    #[instrument(skip(self))]
    pub async fn update_todo(
        &self,
        todo_id: i32,
        patch: UpdateTodo,
    ) -> Result<TodoResponse, ServiceError> {
        let existing = self.find(todo_id).await?;
        if patch.is_empty() {
            return Ok(existing.into());
        }

        let mut active: todo::ActiveModel = existing.into();
        if let Some(title) = patch.title {
            active.title = Set(title);
        }
        if let Some(description) = patch.description {
            active.description = Set(Some(description));
        }
        if let Some(completed) = patch.completed {
            active.completed = Set(completed);
        }

        let updated = active.update(&*self.db_pool).await?;
        info!(todo_id, "todo updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn delete_todo(&self, todo_id: i32) -> Result<(), ServiceError> {
        let existing = self.find(todo_id).await?;
        existing.delete(&*self.db_pool).await?;
        info!(todo_id, "todo deleted");
        Ok(())
    }

    async fn find(&self, todo_id: i32) -> Result<todo::Model, ServiceError> {
        todo::Entity::find_by_id(todo_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Todo"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_default_to_first_hundred() {
        let params: TodoListParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.skip, 0);
        assert_eq!(params.limit, 100);
    }

    #[test]
    fn title_and_description_lengths_are_bounded() {
        let ok = CreateTodo {
            title: "Fix the chiller".into(),
            description: Some("d".repeat(1000)),
            completed: false,
        };
        assert!(ok.validate().is_ok());

        let long_description = CreateTodo {
            description: Some("d".repeat(1001)),
            ..ok.clone()
        };
        assert!(long_description.validate().is_err());

        let empty_title = CreateTodo {
            title: String::new(),
            ..ok
        };
        assert!(empty_title.validate().is_err());
    }

    #[test]
    fn empty_patch_is_detected() {
        assert!(UpdateTodo::default().is_empty());
        assert!(!UpdateTodo {
            completed: Some(true),
            ..Default::default()
        }
        .is_empty());
    }
}
