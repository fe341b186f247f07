//! OpenAPI documentation and schema generation

use utoipa::OpenApi;

/// OpenAPI documentation for the daily-basket REST API
///
/// Served at `/openapi.json`, and through Swagger UI at `/swagger-ui` when enabled.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "daily-basket REST API",
        version = "0.1.0",
        description = "Recipient management, sales passthrough and manual triggering of the daily BIS and voucher reports",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:5000", description = "Local development server")
    ),
    paths(
        // Recipients
        crate::api::routes::list_recipients,
        crate::api::routes::add_recipient,
        crate::api::routes::update_recipient,
        crate::api::routes::delete_recipient,

        // Sales
        crate::api::routes::orders_daily_voucher_sales,
        crate::api::routes::invoices_daily_voucher_sales,
        crate::api::routes::orders_daily_bis_sales,
        crate::api::routes::invoices_daily_bis_sales,

        // Reports
        crate::api::routes::send_email,

        // System
        crate::api::routes::index,
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
    ),
    components(schemas(
        crate::db::Recipient,
        crate::types::Entity,
        crate::types::Partition,
        crate::types::TaskState,
        crate::fetch::FetchErrorKind,
        crate::api::routes::CreateRecipientRequest,
        crate::api::routes::UpdateRecipientRequest,
        crate::api::routes::MessageResponse,
        crate::api::routes::RecipientResponse,
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "recipients", description = "CC recipients of the daily report email"),
        (name = "sales", description = "Today's orders and invoices per payment method"),
        (name = "reports", description = "Run the daily report on demand"),
        (name = "system", description = "Index, health check, OpenAPI spec"),
    )
)]
pub struct ApiDoc;
