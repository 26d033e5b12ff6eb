use crate::{
    db::DbPool,
    entities::{milk_entry, supplier},
    errors::ServiceError,
    services::suppliers::{SupplierResponse, SupplierService},
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

/// Request body for recording a delivery by supplier id
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_new_entry"))]
pub struct CreateEntry {
    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    pub date: NaiveDate,
    pub supplier_id: i32,
    #[schema(example = 25.5)]
    pub liters: f64,
}

/// Request body for recording a delivery by supplier name
#[derive(Debug, Clone, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_new_entry_by_name"))]
pub struct CreateEntryByName {
    #[schema(value_type = String, format = Date, example = "2025-01-15")]
    pub date: NaiveDate,
    #[validate(length(min = 1, max = 100))]
    pub supplier_name: String,
    pub liters: f64,
}

/// Partial update of an entry; absent fields are left unchanged
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate, ToSchema)]
#[validate(schema(function = "validate_entry_patch"))]
pub struct UpdateEntry {
    #[schema(value_type = Option<String>, format = Date)]
    pub date: Option<NaiveDate>,
    pub supplier_id: Option<i32>,
    pub liters: Option<f64>,
}

/// Inclusive date bounds for listing entries
#[derive(Debug, Clone, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EntryFilter {
    #[param(value_type = Option<String>, format = Date)]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = Date)]
    pub end_date: Option<NaiveDate>,
}

/// An entry together with the supplier it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct EntryResponse {
    pub id: i32,
    #[schema(value_type = String, format = Date)]
    pub date: NaiveDate,
    pub supplier_id: i32,
    pub liters: f64,
    pub created_at: DateTime<Utc>,
    pub supplier: SupplierResponse,
}

impl EntryResponse {
    fn from_parts(entry: milk_entry::Model, supplier: supplier::Model) -> Self {
        Self {
            id: entry.id,
            date: entry.date,
            supplier_id: entry.supplier_id,
            liters: entry.liters,
            created_at: entry.created_at,
            supplier: supplier.into(),
        }
    }
}

fn positive_liters(liters: f64) -> Result<(), ValidationError> {
    if liters.is_finite() && liters > 0.0 {
        Ok(())
    } else {
        let mut err = ValidationError::new("liters");
        err.message = Some("liters must be greater than 0".into());
        Err(err)
    }
}

fn validate_new_entry(input: &CreateEntry) -> Result<(), ValidationError> {
    positive_liters(input.liters)
}

fn validate_new_entry_by_name(input: &CreateEntryByName) -> Result<(), ValidationError> {
    positive_liters(input.liters)
}

fn validate_entry_patch(input: &UpdateEntry) -> Result<(), ValidationError> {
    input.liters.map_or(Ok(()), positive_liters)
}

/// Service for recording and querying milk deliveries
#[derive(Clone)]
pub struct EntryService {
    db_pool: Arc<DbPool>,
    suppliers: SupplierService,
}

impl EntryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        let suppliers = SupplierService::new(db_pool.clone());
        Self { db_pool, suppliers }
    }

    /// Records a delivery for an active supplier
    #[instrument(skip(self))]
    pub async fn create_entry(&self, input: CreateEntry) -> Result<EntryResponse, ServiceError> {
        let supplier = self.suppliers.find_active_model(input.supplier_id).await?;
        self.insert(input.date, supplier, input.liters).await
    }

    /// Records a delivery, resolving the active supplier by exact name
    #[instrument(skip(self))]
    pub async fn create_entry_by_name(
        &self,
        input: CreateEntryByName,
    ) -> Result<EntryResponse, ServiceError> {
        let supplier = self
            .suppliers
            .find_active_by_name(&input.supplier_name)
            .await?;
        self.insert(input.date, supplier, input.liters).await
    }

    async fn insert(
        &self,
        date: NaiveDate,
        supplier: supplier::Model,
        liters: f64,
    ) -> Result<EntryResponse, ServiceError> {
        let entry = milk_entry::ActiveModel {
            date: Set(date),
            supplier_id: Set(supplier.id),
            liters: Set(liters),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await?;

        info!(entry_id = entry.id, supplier_id = supplier.id, "milk entry recorded");
        Ok(EntryResponse::from_parts(entry, supplier))
    }

    /// Lists entries, newest first, optionally bounded by inclusive dates.
    ///
    /// Entries of deactivated suppliers are still listed.
    #[instrument(skip(self))]
    pub async fn list_entries(
        &self,
        filter: EntryFilter,
    ) -> Result<Vec<EntryResponse>, ServiceError> {
        let mut query = milk_entry::Entity::find().find_also_related(supplier::Entity);
        if let Some(start) = filter.start_date {
            query = query.filter(milk_entry::Column::Date.gte(start));
        }
        if let Some(end) = filter.end_date {
            query = query.filter(milk_entry::Column::Date.lte(end));
        }

        let rows = query
            .order_by_desc(milk_entry::Column::Date)
            .order_by_desc(milk_entry::Column::Id)
            .all(&*self.db_pool)
            .await?;

        rows.into_iter()
            .map(|(entry, supplier)| match supplier {
                Some(supplier) => Ok(EntryResponse::from_parts(entry, supplier)),
                None => Err(orphaned(&entry)),
            })
            .collect()
    }

    /// Gets one entry by ID
    #[instrument(skip(self))]
    pub async fn get_entry(&self, entry_id: i32) -> Result<EntryResponse, ServiceError> {
        let (entry, supplier) = self.find_with_supplier(entry_id).await?;
        Ok(EntryResponse::from_parts(entry, supplier))
    }

    /// Applies a partial update; a new supplier must be active
    #[instrument(skip(self))]
    pub async fn update_entry(
        &self,
        entry_id: i32,
        patch: UpdateEntry,
    ) -> Result<EntryResponse, ServiceError> {
        let (entry, mut supplier) = self.find_with_supplier(entry_id).await?;

        if let Some(new_supplier_id) = patch.supplier_id {
            supplier = self.suppliers.find_active_model(new_supplier_id).await?;
        }

        let mut active: milk_entry::ActiveModel = entry.into();
        if let Some(date) = patch.date {
            active.date = Set(date);
        }
        if patch.supplier_id.is_some() {
            active.supplier_id = Set(supplier.id);
        }
        if let Some(liters) = patch.liters {
            active.liters = Set(liters);
        }

        let updated = active.update(&*self.db_pool).await?;
        info!(entry_id, "milk entry updated");
        Ok(EntryResponse::from_parts(updated, supplier))
    }

    /// Permanently removes an entry
    #[instrument(skip(self))]
    pub async fn delete_entry(&self, entry_id: i32) -> Result<(), ServiceError> {
        let entry = milk_entry::Entity::find_by_id(entry_id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Entry"))?;

        entry.delete(&*self.db_pool).await?;
        info!(entry_id, "milk entry deleted");
        Ok(())
    }

    async fn find_with_supplier(
        &self,
        entry_id: i32,
    ) -> Result<(milk_entry::Model, supplier::Model), ServiceError> {
        let (entry, supplier) = milk_entry::Entity::find_by_id(entry_id)
            .find_also_related(supplier::Entity)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::not_found("Entry"))?;

        match supplier {
            Some(supplier) => Ok((entry, supplier)),
            None => Err(orphaned(&entry)),
        }
    }
}

fn orphaned(entry: &milk_entry::Model) -> ServiceError {
    error!(
        entry_id = entry.id,
        supplier_id = entry.supplier_id,
        "milk entry references a missing supplier"
    );
    ServiceError::InternalError(format!("entry {} has no supplier", entry.id))
}
