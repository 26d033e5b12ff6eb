use crate::{
    db::DbPool,
    entities::{milk_entry, supplier, supplier::MilkType},
    errors::ServiceError,
};
use chrono::NaiveDate;
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, FromQueryResult, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

/// Per-supplier liters for one period, as returned by the aggregation query
#[derive(Debug, Clone, PartialEq, FromQueryResult)]
pub struct SupplierTotalsRow {
    pub supplier_id: i32,
    pub supplier_name: String,
    pub milk_type: MilkType,
    pub rate_per_liter: f64,
    pub total_liters: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SupplierReportRow {
    pub supplier_id: i32,
    pub supplier_name: String,
    pub milk_type: MilkType,
    pub rate_per_liter: f64,
    pub total_liters: f64,
    pub total_amount: f64,
}

/// Payment summary for one calendar month
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyReport {
    pub year: i64,
    pub month: u32,
    pub suppliers: Vec<SupplierReportRow>,
    pub grand_total_liters: f64,
    pub grand_total_amount: f64,
}

/// Half-open date range `[first of month, first of next month)`.
///
/// `None` when the month is outside 1..=12 or the year is outside the
/// calendar `NaiveDate` can represent.
pub fn month_bounds(year: i64, month: u32) -> Option<(NaiveDate, NaiveDate)> {
    let year = i32::try_from(year).ok()?;
    let start = NaiveDate::from_ymd_opt(year, month, 1)?;
    let end = if month == 12 {
        NaiveDate::from_ymd_opt(year.checked_add(1)?, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    Some((start, end))
}

/// Turns grouped rows into a report.
///
/// Amounts are `total_liters * rate_per_liter` with no intermediate
/// rounding; grand totals are plain sums over the rows, in row order.
pub fn build_report(year: i64, month: u32, rows: Vec<SupplierTotalsRow>) -> MonthlyReport {
    let suppliers: Vec<SupplierReportRow> = rows
        .into_iter()
        .map(|row| SupplierReportRow {
            total_amount: row.total_liters * row.rate_per_liter,
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
            milk_type: row.milk_type,
            rate_per_liter: row.rate_per_liter,
            total_liters: row.total_liters,
        })
        .collect();

    let grand_total_liters = suppliers.iter().map(|r| r.total_liters).sum();
    let grand_total_amount = suppliers.iter().map(|r| r.total_amount).sum();

    MonthlyReport {
        year,
        month,
        suppliers,
        grand_total_liters,
        grand_total_amount,
    }
}

/// Service computing monthly payment reports
#[derive(Clone)]
pub struct ReportService {
    db_pool: Arc<DbPool>,
}

impl ReportService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Totals per active supplier for one month, priced at the current rate
    #[instrument(skip(self))]
    pub async fn monthly_report(&self, year: i64, month: u32) -> Result<MonthlyReport, ServiceError> {
        if !(1..=12).contains(&month) {
            warn!(month, "report requested for invalid month");
            return Err(ServiceError::ValidationError(
                "month must be between 1 and 12".to_string(),
            ));
        }

        let Some((start, end)) = month_bounds(year, month) else {
            debug!(year, month, "period outside the representable calendar");
            return Ok(build_report(year, month, Vec::new()));
        };

        let rows = milk_entry::Entity::find()
            .select_only()
            .column_as(supplier::Column::Id, "supplier_id")
            .column_as(supplier::Column::Name, "supplier_name")
            .column_as(supplier::Column::MilkType, "milk_type")
            .column_as(supplier::Column::RatePerLiter, "rate_per_liter")
            .column_as(
                Expr::col((milk_entry::Entity, milk_entry::Column::Liters)).sum(),
                "total_liters",
            )
            .join(JoinType::InnerJoin, milk_entry::Relation::Supplier.def())
            .filter(supplier::active())
            .filter(milk_entry::Column::Date.gte(start))
            .filter(milk_entry::Column::Date.lt(end))
            .group_by(supplier::Column::Id)
            .group_by(supplier::Column::Name)
            .group_by(supplier::Column::MilkType)
            .group_by(supplier::Column::RatePerLiter)
            .order_by_asc(supplier::Column::Name)
            .order_by_asc(supplier::Column::Id)
            .into_model::<SupplierTotalsRow>()
            .all(&*self.db_pool)
            .await?;

        debug!(year, month, suppliers = rows.len(), "monthly totals aggregated");

        Ok(build_report(year, month, rows))
    }
}
