use crate::{
    auth::{password, user, CurrentUser},
    db::DbPool,
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

const DUPLICATE_EMAIL: &str = "Email already registered";

/// Request body for creating an account
#[derive(Clone, Deserialize, Serialize, Validate, ToSchema)]
pub struct RegisterUser {
    #[validate(email)]
    #[schema(example = "farmer@example.com")]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

impl std::fmt::Debug for RegisterUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisterUser")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Service for account registration
#[derive(Clone)]
pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Creates an account with an Argon2id password hash
    #[instrument(skip(self))]
    pub async fn register(&self, input: RegisterUser) -> Result<CurrentUser, ServiceError> {
        let db = &*self.db_pool;

        let existing = user::Entity::find()
            .filter(user::Column::Email.eq(input.email.as_str()))
            .one(db)
            .await?;
        if existing.is_some() {
            warn!(email = %input.email, "registration for existing email");
            return Err(ServiceError::Conflict(DUPLICATE_EMAIL.to_string()));
        }

        let hashed_password = password::hash_password_blocking(input.password)
            .await
            .map_err(|e| ServiceError::HashError(e.to_string()))?;

        let model = user::ActiveModel {
            email: Set(input.email),
            hashed_password: Set(hashed_password),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| {
            if super::is_unique_violation(&e) {
                ServiceError::Conflict(DUPLICATE_EMAIL.to_string())
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        info!(user_id = model.id, "account registered");
        Ok(model.into())
    }
}
