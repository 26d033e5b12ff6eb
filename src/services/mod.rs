pub mod entries;
pub mod reports;
pub mod suppliers;
pub mod todos;
pub mod users;

use sea_orm::{DbErr, SqlErr};

/// True when the store rejected a write because of a unique index
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
