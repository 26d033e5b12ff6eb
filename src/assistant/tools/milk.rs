use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;
use std::str::FromStr;
use std::sync::Arc;
use tracing::debug;

use super::{
    parse_args, success_body, transport_failure, unknown_tool, ToolResult, Toolset, AUTH_FAILED,
};
use crate::assistant::{client::LedgerClient, model::ToolDefinition};
use crate::entities::supplier::MilkType;
use crate::services::{
    entries::{CreateEntryByName, EntryResponse},
    reports::MonthlyReport,
    suppliers::{CreateSupplier, SupplierResponse, UpdateSupplier},
};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Deserialize)]
struct AddMilkEntryArgs {
    supplier_name: String,
    liters: f64,
    #[serde(default)]
    entry_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ListEntriesArgs {
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MonthlyReportArgs {
    year: i64,
    month: i64,
}

#[derive(Debug, Deserialize)]
struct UpdateRateArgs {
    supplier_name: String,
    new_rate: f64,
}

#[derive(Debug, Deserialize)]
struct AddSupplierArgs {
    name: String,
    milk_type: String,
    rate: f64,
}

/// Ledger tools: entries, reports and suppliers
pub struct MilkTools {
    client: Arc<LedgerClient>,
}

impl MilkTools {
    pub fn new(client: Arc<LedgerClient>) -> Self {
        Self { client }
    }

    async fn add_milk_entry(&self, args: AddMilkEntryArgs) -> ToolResult {
        let date = match args.entry_date.as_deref().map(str::trim) {
            None | Some("") => Local::now().date_naive(),
            Some(raw) => parse_date(raw)?,
        };
        let payload = CreateEntryByName {
            date,
            supplier_name: args.supplier_name.clone(),
            liters: args.liters,
        };

        let reply = self
            .client
            .post_json(&["entries", "by-name"], &payload)
            .await
            .map_err(transport_failure("adding milk entry"))?;

        match reply.status {
            StatusCode::NOT_FOUND => {
                return Ok(format!(
                    "Supplier '{}' not found. Please check the name or add the supplier first.",
                    args.supplier_name
                ))
            }
            StatusCode::UNAUTHORIZED => return Ok(AUTH_FAILED.to_string()),
            _ => {}
        }

        let entry: EntryResponse = success_body(&reply, "adding milk entry")?;
        Ok(format!(
            "Added milk entry:\n- Supplier: {}\n- Date: {}\n- Liters: {:.2}\n- Entry ID: {}",
            entry.supplier.name, entry.date, entry.liters, entry.id
        ))
    }

    async fn list_entries(&self, args: ListEntriesArgs) -> ToolResult {
        let start = non_empty(args.start_date);
        let end = non_empty(args.end_date);

        let mut query = Vec::new();
        if let Some(start) = &start {
            query.push(("start_date", start.clone()));
        }
        if let Some(end) = &end {
            query.push(("end_date", end.clone()));
        }

        let reply = self
            .client
            .get(&["entries"], &query)
            .await
            .map_err(transport_failure("listing entries"))?;
        if reply.status == StatusCode::UNAUTHORIZED {
            return Ok(AUTH_FAILED.to_string());
        }

        let entries: Vec<EntryResponse> = success_body(&reply, "listing entries")?;
        if entries.is_empty() {
            let range = if start.is_some() || end.is_some() {
                format!(
                    " between {} and {}",
                    start.as_deref().unwrap_or("start"),
                    end.as_deref().unwrap_or("now")
                )
            } else {
                String::new()
            };
            return Ok(format!("No milk entries found{}.", range));
        }

        let mut out = format!("Milk Entries ({} total):\n", entries.len());
        out.push_str(&"-".repeat(50));
        out.push('\n');
        for entry in &entries {
            let _ = writeln!(
                out,
                "[{}] {}: {:.2} liters ({} milk)",
                entry.date,
                entry.supplier.name,
                entry.liters,
                entry.supplier.milk_type.as_str()
            );
        }
        Ok(out)
    }

    async fn get_monthly_report(&self, args: MonthlyReportArgs) -> ToolResult {
        if !(1..=12).contains(&args.month) {
            return Ok("Invalid month. Please provide a month between 1 and 12.".to_string());
        }
        let year = args.year.to_string();
        let month = args.month.to_string();

        let reply = self
            .client
            .get(&["reports", "monthly", &year, &month], &[])
            .await
            .map_err(transport_failure("getting monthly report"))?;
        if reply.status == StatusCode::UNAUTHORIZED {
            return Ok(AUTH_FAILED.to_string());
        }

        let report: MonthlyReport = success_body(&reply, "getting monthly report")?;
        Ok(render_report(&report))
    }

    async fn list_suppliers(&self) -> ToolResult {
        let reply = self
            .client
            .get(&["suppliers"], &[])
            .await
            .map_err(transport_failure("listing suppliers"))?;
        if reply.status == StatusCode::UNAUTHORIZED {
            return Ok(AUTH_FAILED.to_string());
        }

        let suppliers: Vec<SupplierResponse> = success_body(&reply, "listing suppliers")?;
        if suppliers.is_empty() {
            return Ok("No active suppliers found.".to_string());
        }

        let rule = "-".repeat(50);
        let mut out = format!("Active Suppliers:\n{}\n", rule);
        let _ = writeln!(out, "{:<25} {:<10} {:>12}", "Name", "Type", "Rate/Liter");
        let _ = writeln!(out, "{}", rule);
        for supplier in &suppliers {
            let _ = writeln!(
                out,
                "{:<25} {:<10} Rs. {:>8.2}",
                supplier.name,
                supplier.milk_type.as_str(),
                supplier.rate_per_liter
            );
        }
        Ok(out)
    }

    async fn update_supplier_rate(&self, args: UpdateRateArgs) -> ToolResult {
        if !(args.new_rate.is_finite() && args.new_rate > 0.0) {
            return Ok("Rate must be a positive number.".to_string());
        }

        let reply = self
            .client
            .get(&["suppliers", "by-name", &args.supplier_name], &[])
            .await
            .map_err(transport_failure("updating supplier rate"))?;
        match reply.status {
            StatusCode::NOT_FOUND => {
                return Ok(format!("Supplier '{}' not found.", args.supplier_name))
            }
            StatusCode::UNAUTHORIZED => return Ok(AUTH_FAILED.to_string()),
            _ => {}
        }
        let current: SupplierResponse = success_body(&reply, "updating supplier rate")?;

        let patch = UpdateSupplier {
            rate_per_liter: Some(args.new_rate),
            ..Default::default()
        };
        let id = current.id.to_string();
        let reply = self
            .client
            .patch_json(&["suppliers", &id], &patch)
            .await
            .map_err(transport_failure("updating supplier rate"))?;
        if reply.status == StatusCode::UNAUTHORIZED {
            return Ok(AUTH_FAILED.to_string());
        }
        let updated: SupplierResponse = success_body(&reply, "updating supplier rate")?;

        Ok(format!(
            "Updated supplier rate:\n- Supplier: {}\n- Milk Type: {}\n- Old Rate: Rs. {:.2}/liter\n- New Rate: Rs. {:.2}/liter",
            updated.name,
            updated.milk_type.as_str(),
            current.rate_per_liter,
            updated.rate_per_liter
        ))
    }

    async fn add_supplier(&self, args: AddSupplierArgs) -> ToolResult {
        let milk_type = match MilkType::from_str(args.milk_type.trim()) {
            Ok(milk_type) => milk_type,
            Err(_) => return Ok("Invalid milk type. Must be 'cow' or 'buffalo'.".to_string()),
        };
        if !(args.rate.is_finite() && args.rate > 0.0) {
            return Ok("Rate must be a positive number.".to_string());
        }
        let name = args.name.trim();
        if name.is_empty() || name.chars().count() > 100 {
            return Ok("Supplier name must be between 1 and 100 characters.".to_string());
        }

        let payload = CreateSupplier {
            name: name.to_string(),
            milk_type,
            rate_per_liter: args.rate,
        };
        let reply = self
            .client
            .post_json(&["suppliers"], &payload)
            .await
            .map_err(transport_failure("adding supplier"))?;
        match reply.status {
            StatusCode::BAD_REQUEST => {
                return Ok(format!("Could not add supplier: {}", reply.error_message()))
            }
            StatusCode::UNAUTHORIZED => return Ok(AUTH_FAILED.to_string()),
            _ => {}
        }

        let supplier: SupplierResponse = success_body(&reply, "adding supplier")?;
        Ok(format!(
            "Added new supplier:\n- Name: {}\n- Milk Type: {}\n- Rate: Rs. {:.2}/liter\n- Supplier ID: {}",
            supplier.name,
            supplier.milk_type.as_str(),
            supplier.rate_per_liter,
            supplier.id
        ))
    }
}

#[async_trait]
impl Toolset for MilkTools {
    fn definitions(&self) -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::function(
                "add_milk_entry",
                "Add a milk entry for a supplier. Uses today's date when no date is given.",
                json!({
                    "type": "object",
                    "properties": {
                        "supplier_name": {"type": "string", "description": "The name of the milk supplier."},
                        "liters": {"type": "number", "description": "Amount of milk in liters (must be positive)."},
                        "entry_date": {"type": "string", "description": "Optional date in YYYY-MM-DD format."}
                    },
                    "required": ["supplier_name", "liters"]
                }),
            ),
            ToolDefinition::function(
                "list_entries",
                "List milk entries, optionally between two dates (inclusive).",
                json!({
                    "type": "object",
                    "properties": {
                        "start_date": {"type": "string", "description": "Optional start date in YYYY-MM-DD format."},
                        "end_date": {"type": "string", "description": "Optional end date in YYYY-MM-DD format."}
                    }
                }),
            ),
            ToolDefinition::function(
                "get_monthly_report",
                "Get the monthly report with liters and payment totals per supplier.",
                json!({
                    "type": "object",
                    "properties": {
                        "year": {"type": "integer", "description": "The year for the report, e.g. 2024."},
                        "month": {"type": "integer", "description": "The month for the report (1-12)."}
                    },
                    "required": ["year", "month"]
                }),
            ),
            ToolDefinition::function(
                "list_suppliers",
                "List all active suppliers with their milk type and rate per liter.",
                json!({"type": "object", "properties": {}}),
            ),
            ToolDefinition::function(
                "update_supplier_rate",
                "Change a supplier's rate per liter.",
                json!({
                    "type": "object",
                    "properties": {
                        "supplier_name": {"type": "string", "description": "The name of the supplier to update."},
                        "new_rate": {"type": "number", "description": "The new rate per liter (must be positive)."}
                    },
                    "required": ["supplier_name", "new_rate"]
                }),
            ),
            ToolDefinition::function(
                "add_supplier",
                "Add a new milk supplier.",
                json!({
                    "type": "object",
                    "properties": {
                        "name": {"type": "string", "description": "The name of the supplier (1-100 characters)."},
                        "milk_type": {"type": "string", "enum": ["cow", "buffalo"], "description": "Type of milk."},
                        "rate": {"type": "number", "description": "Rate per liter (must be positive)."}
                    },
                    "required": ["name", "milk_type", "rate"]
                }),
            ),
        ]
    }

    async fn call(&self, name: &str, arguments: &str) -> String {
        debug!(tool = name, "running milk tool");
        let result = match name {
            "add_milk_entry" => match parse_args(name, arguments) {
                Ok(args) => self.add_milk_entry(args).await,
                Err(e) => Err(e),
            },
            "list_entries" => match parse_args(name, arguments) {
                Ok(args) => self.list_entries(args).await,
                Err(e) => Err(e),
            },
            "get_monthly_report" => match parse_args(name, arguments) {
                Ok(args) => self.get_monthly_report(args).await,
                Err(e) => Err(e),
            },
            "list_suppliers" => self.list_suppliers().await,
            "update_supplier_rate" => match parse_args(name, arguments) {
                Ok(args) => self.update_supplier_rate(args).await,
                Err(e) => Err(e),
            },
            "add_supplier" => match parse_args(name, arguments) {
                Ok(args) => self.add_supplier(args).await,
                Err(e) => Err(e),
            },
            other => Err(unknown_tool(other)),
        };
        result.unwrap_or_else(|message| message)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| format!("Invalid date '{}'. Please use YYYY-MM-DD.", raw))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn render_report(report: &MonthlyReport) -> String {
    let month_name = report
        .month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown");

    let mut out = format!(
        "Monthly Milk Collection Report - {} {}\n{}\n\n",
        month_name,
        report.year,
        "=".repeat(60)
    );

    if report.suppliers.is_empty() {
        out.push_str("No entries found for this month.\n");
    } else {
        let _ = writeln!(
            out,
            "{:<20} {:<10} {:>10} {:>8} {:>12}",
            "Supplier", "Type", "Liters", "Rate", "Amount"
        );
        let _ = writeln!(out, "{}", "-".repeat(60));
        for row in &report.suppliers {
            let _ = writeln!(
                out,
                "{:<20} {:<10} {:>10.2} {:>8.2} {:>12.2}",
                row.supplier_name,
                row.milk_type.as_str(),
                row.total_liters,
                row.rate_per_liter,
                row.total_amount
            );
        }
        let _ = writeln!(out, "{}", "-".repeat(60));
    }

    let _ = write!(
        out,
        "\nGrand Total: {:.2} liters\nTotal Amount: Rs. {:.2}\n",
        report.grand_total_liters, report.grand_total_amount
    );
    out
}
