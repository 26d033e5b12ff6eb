use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::SimpleExpr;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Kind of milk a supplier delivers
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    ToSchema,
    strum::EnumString,
    strum::Display,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MilkType {
    #[sea_orm(string_value = "cow")]
    Cow,
    #[sea_orm(string_value = "buffalo")]
    Buffalo,
}

impl MilkType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MilkType::Cow => "cow",
            MilkType::Buffalo => "buffalo",
        }
    }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "suppliers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub name: String,
    pub milk_type: MilkType,
    pub rate_per_liter: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::milk_entry::Entity")]
    MilkEntry,
}

impl Related<super::milk_entry::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MilkEntry.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Condition selecting suppliers that have not been soft-deleted
pub fn active() -> SimpleExpr {
    Column::IsActive.eq(true)
}

impl Entity {
    /// Suppliers that have not been soft-deleted.
    ///
    /// Every lookup that must ignore deactivated suppliers starts here, and
    /// joins that cannot start from this entity filter on [`active`].
    pub fn find_active() -> Select<Entity> {
        Self::find().filter(active())
    }
}
