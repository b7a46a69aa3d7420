//! OpenAPI documentation.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use reciva_core::models;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Reciva API",
        version = "0.1.0",
        description = "Receipt processing API: batch upload of receipt images and PDFs, OCR extraction into structured data, CSV/JSON/Excel export, and spending analytics. All endpoints are versioned under /api/v1/."
    ),
    paths(
        handlers::upload::process_receipts,
        handlers::files::list_files,
        handlers::files::get_file,
        handlers::files::delete_file,
        handlers::exports::create_export,
        handlers::analytics::spending_report,
        handlers::usage::get_usage,
        handlers::webhook::subscription_webhook,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::upload::ProcessBatchResponse,
        handlers::files::FileListResponse,
        handlers::exports::ExportRequest,
        handlers::usage::UsageResponse,
        models::ProcessedFileResponse,
        models::FileStatus,
        models::Receipt,
        models::ReceiptItem,
        models::MergedExport,
        models::ExportSummary,
        models::CombinedItem,
        models::ExportFormat,
        models::SpendingReport,
        models::SpendingReportRow,
        models::Tier,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "receipts", description = "Batch receipt processing"),
        (name = "files", description = "Processed file management"),
        (name = "exports", description = "Merged data export"),
        (name = "analytics", description = "Spending analytics"),
        (name = "usage", description = "Usage and quota"),
        (name = "webhooks", description = "Subscription provider callbacks")
    )
)]
pub struct ApiDoc;
