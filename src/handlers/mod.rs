pub mod auth;
pub mod common;
pub mod entries;
pub mod reports;
pub mod suppliers;
pub mod todos;

use crate::db::DbPool;
use crate::services::{
    entries::EntryService, reports::ReportService, suppliers::SupplierService,
    todos::TodoService, users::UserService,
};
use std::sync::Arc;

pub use crate::AppState;

/// Services shared by every handler
#[derive(Clone)]
pub struct AppServices {
    pub suppliers: Arc<SupplierService>,
    pub entries: Arc<EntryService>,
    pub reports: Arc<ReportService>,
    pub todos: Arc<TodoService>,
    pub users: Arc<UserService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            suppliers: Arc::new(SupplierService::new(db_pool.clone())),
            entries: Arc::new(EntryService::new(db_pool.clone())),
            reports: Arc::new(ReportService::new(db_pool.clone())),
            todos: Arc::new(TodoService::new(db_pool.clone())),
            users: Arc::new(UserService::new(db_pool)),
        }
    }
}
