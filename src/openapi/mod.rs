use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

/// Path the generated document is served from
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Milk Ledger API",
        version = "1.0.0",
        description = r#"
# Milk Ledger API

Daily milk collection ledger for a dairy collection point.

- **Suppliers**: farmers delivering cow or buffalo milk at a per-liter rate
- **Entries**: liters delivered by a supplier on a date
- **Reports**: monthly liters and amount owed per active supplier
- **Todos**: a small task list for the collection point

## Authentication

Register with `POST /api/v1/auth/register`, then exchange the credentials for a
token at `POST /api/v1/auth/token`. Every other endpoint needs:

```
Authorization: Bearer <token>
```

## Errors

```json
{
  "error": "Not Found",
  "message": "Supplier not found",
  "timestamp": "2025-01-15T08:30:00+00:00"
}
```
        "#
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "Auth", description = "Accounts and bearer tokens"),
        (name = "Suppliers", description = "Supplier management"),
        (name = "Entries", description = "Daily milk entries"),
        (name = "Reports", description = "Monthly payment reports"),
        (name = "Todos", description = "Todo list")
    ),
    paths(
        crate::handlers::auth::register,
        crate::handlers::auth::issue_token,
        crate::handlers::auth::me,

        crate::handlers::suppliers::create_supplier,
        crate::handlers::suppliers::list_suppliers,
        crate::handlers::suppliers::get_supplier,
        crate::handlers::suppliers::get_supplier_by_name,
        crate::handlers::suppliers::update_supplier,
        crate::handlers::suppliers::delete_supplier,

        crate::handlers::entries::create_entry,
        crate::handlers::entries::create_entry_by_name,
        crate::handlers::entries::list_entries,
        crate::handlers::entries::get_entry,
        crate::handlers::entries::update_entry,
        crate::handlers::entries::delete_entry,

        crate::handlers::reports::monthly_report,

        crate::handlers::todos::create_todo,
        crate::handlers::todos::list_todos,
        crate::handlers::todos::get_todo,
        crate::handlers::todos::update_todo,
        crate::handlers::todos::delete_todo
    ),
    components(
        schemas(
            crate::entities::supplier::MilkType,
            crate::services::suppliers::CreateSupplier,
            crate::services::suppliers::UpdateSupplier,
            crate::services::suppliers::SupplierResponse,
            crate::services::entries::CreateEntry,
            crate::services::entries::CreateEntryByName,
            crate::services::entries::UpdateEntry,
            crate::services::entries::EntryResponse,
            crate::services::reports::MonthlyReport,
            crate::services::reports::SupplierReportRow,
            crate::services::todos::CreateTodo,
            crate::services::todos::UpdateTodo,
            crate::services::todos::TodoResponse,
            crate::services::users::RegisterUser,
            crate::handlers::auth::TokenRequest,
            crate::auth::TokenResponse,
            crate::auth::CurrentUser,
            crate::errors::ErrorResponse
        )
    ),
    modifiers(&BearerSecurity)
)]
pub struct ApiDocV1;

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "Bearer",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url(OPENAPI_JSON_PATH, ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from(OPENAPI_JSON_PATH).try_it_out_enabled(true))
}
