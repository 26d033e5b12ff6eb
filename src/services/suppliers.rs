use crate::{
    db::DbPool,
    entities::supplier::{self, MilkType},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

const DUPLICATE_NAME: &str = "Supplier with this name already exists";

/// Request body for registering a supplier
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_new_supplier"))]
pub struct CreateSupplier {
    #[validate(length(min = 1, max = 100))]
    #[schema(example = "Green Valley Farm")]
    pub name: String,
    pub milk_type: MilkType,
    #[schema(example = 55.0)]
    pub rate_per_liter: f64,
}

/// Partial update of a supplier; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_supplier_patch"))]
pub struct UpdateSupplier {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    pub milk_type: Option<MilkType>,
    pub rate_per_liter: Option<f64>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierResponse {
    pub id: i32,
    pub name: String,
    pub milk_type: MilkType,
    pub rate_per_liter: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<supplier::Model> for SupplierResponse {
    fn from(model: supplier::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            milk_type: model.milk_type,
            rate_per_liter: model.rate_per_liter,
            is_active: model.is_active,
            created_at: model.created_at,
        }
    }
}

pub(crate) fn positive_rate(rate: f64) -> Result<(), ValidationError> {
    if rate.is_finite() && rate > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("rate_per_liter");
        err.message = Some("rate_per_liter must be greater than 0".into());
        Err(err)
    }
}

fn validate_new_supplier(input: &CreateSupplier) -> Result<(), ValidationError> {
    positive_rate(input.rate_per_liter)
}

fn validate_supplier_patch(input: &UpdateSupplier) -> Result<(), ValidationError> {
    input.rate_per_liter.map_or(Ok(()), positive_rate)
}

/// Service for managing suppliers
#[derive(Clone)]
pub struct SupplierService {
    db_pool: Arc<DbPool>,
}

impl SupplierService {
    /// Creates a new supplier service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Registers a supplier; names are unique across active and inactive suppliers
    #[instrument(skip(self))]
    pub async fn create_supplier(
        &self,
        input: CreateSupplier,
    ) -> Result<SupplierResponse, ServiceError> {
        let db = &*self.db_pool;

        if self.name_taken(&input.name, None).await? {
            warn!(name = %input.name, "duplicate supplier name");
            return Err(ServiceError::Conflict(DUPLICATE_NAME.to_string()));
        }

        let model = supplier::ActiveModel {
            name: Set(input.name),
            milk_type: Set(input.milk_type),
            rate_per_liter: Set(input.rate_per_liter),
            is_active: Set(true),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(map_write_error)?;

        info!(supplier_id = model.id, "supplier created");
        Ok(model.into())
    }

    /// Lists active suppliers ordered by id
    #[instrument(skip(self))]
    pub async fn list_suppliers(&self) -> Result<Vec<SupplierResponse>, ServiceError> {
        let suppliers = supplier::Entity::find_active()
            .order_by_asc(supplier::Column::Id)
            .all(&*self.db_pool)
            .await?;

        Ok(suppliers.into_iter().map(Into::into).collect())
    }

    /// Gets an active supplier by ID
    #[instrument(skip(self))]
    pub async fn get_supplier(&self, supplier_id: i32) -> Result<SupplierResponse, ServiceError> {
        self.find_active_model(supplier_id).await.map(Into::into)
    }

    /// Gets an active supplier by exact name
    #[instrument(skip(self))]
    pub async fn get_supplier_by_name(&self, name: &str) -> Result<SupplierResponse, ServiceError> {
        self.find_active_by_name(name).await.map(Into::into)
    }

    /// Applies a partial update.
    ///
    /// Inactive suppliers are found too, so `is_active: true` reactivates them.
    #[instrument(skip(self))]
    pub async fn update_supplier(
        &self,
        supplier_id: i32,
        patch: UpdateSupplier,
    ) -> Result<SupplierResponse, ServiceError> {
        let db = &*self.db_pool;

        let existing = supplier::Entity::find_by_id(supplier_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier"))?;

        if let Some(name) = patch.name.as_deref() {
            if name != existing.name && self.name_taken(name, Some(supplier_id)).await? {
                warn!(supplier_id, name, "rename collides with another supplier");
                return Err(ServiceError::Conflict(DUPLICATE_NAME.to_string()));
            }
        }

        let mut active: supplier::ActiveModel = existing.into();
        if let Some(name) = patch.name {
            active.name = Set(name);
        }
        if let Some(milk_type) = patch.milk_type {
            active.milk_type = Set(milk_type);
        }
        if let Some(rate) = patch.rate_per_liter {
            active.rate_per_liter = Set(rate);
        }
        if let Some(is_active) = patch.is_active {
            active.is_active = Set(is_active);
        }

        let updated = active.update(db).await.map_err(map_write_error)?;
        info!(supplier_id, "supplier updated");
        Ok(updated.into())
    }

    /// Soft-deletes an active supplier; its entries are kept
    #[instrument(skip(self))]
    pub async fn deactivate_supplier(&self, supplier_id: i32) -> Result<(), ServiceError> {
        let existing = self.find_active_model(supplier_id).await?;

        let mut active: supplier::ActiveModel = existing.into();
        active.is_active = Set(false);
        active.update(&*self.db_pool).await?;

        info!(supplier_id, "supplier deactivated");
        Ok(())
    }

    pub(crate) async fn find_active_model(
        &self,
        supplier_id: i32,
    ) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_active()
            .filter(supplier::Column::Id.eq(supplier_id))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier"))
    }

    pub(crate) async fn find_active_by_name(
        &self,
        name: &str,
    ) -> Result<supplier::Model, ServiceError> {
        supplier::Entity::find_active()
            .filter(supplier::Column::Name.eq(name))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Supplier"))
    }

    async fn name_taken(&self, name: &str, except_id: Option<i32>) -> Result<bool, ServiceError> {
        let mut query = supplier::Entity::find().filter(supplier::Column::Name.eq(name));
        if let Some(id) = except_id {
            query = query.filter(supplier::Column::Id.ne(id));
        }
        Ok(query.one(&*self.db_pool).await?.is_some())
    }
}

// A concurrent insert can slip past the pre-check and hit the unique index
fn map_write_error(err: sea_orm::DbErr) -> ServiceError {
    if super::is_unique_violation(&err) {
        ServiceError::Conflict(DUPLICATE_NAME.to_string())
    } else {
        ServiceError::DatabaseError(err)
    }
}
