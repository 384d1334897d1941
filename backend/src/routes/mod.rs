//! Route definitions for ConServ

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{
    handlers,
    middleware::{auth_middleware, staff_middleware},
    AppState,
};

/// Create API routes, mounted under `/api`
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Accounts (public)
        .route("/signup", post(handlers::signup))
        .route("/login", post(handlers::login))
        // Storefront helpers (public)
        .route("/verify-address", post(handlers::verify_address))
        .route("/delivery-quote", post(handlers::delivery_quote))
        .route("/uploads", post(handlers::upload_files))
        // BuildAdvisor (public)
        .route("/chat", post(handlers::chat))
        .route("/bom/extract", post(handlers::extract_bom))
        // Signed-in customers
        .merge(account_routes(state.clone()))
        // Back office
        .nest("/staff", staff_routes(state.clone()))
        .nest("/admin", admin_routes(state))
}

/// Routes for any signed-in account
fn account_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(handlers::me))
        .route("/me/recompute", post(handlers::recompute))
        .route("/me/location", post(handlers::update_location))
        .route("/checkout", post(handlers::checkout))
        .route("/orders", get(handlers::list_orders))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Staff-only ERP routes
fn staff_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/suppliers",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/purchases",
            get(handlers::list_invoices).post(handlers::create_invoice),
        )
        .route(
            "/purchases/:id",
            get(handlers::get_invoice).put(handlers::update_invoice),
        )
        .route("/purchases/draft", post(handlers::purchases::draft_from_text))
        .route(
            "/purchases/draft-from-files",
            post(handlers::purchases::draft_from_files),
        )
        .route(
            "/sales",
            get(handlers::list_receipts).post(handlers::create_receipt),
        )
        .route("/sales/:id", get(handlers::get_receipt))
        .route(
            "/expenses",
            get(handlers::list_expenses).post(handlers::create_expenses),
        )
        .route("/expenses/draft", post(handlers::expenses::draft_from_text))
        .route(
            "/expenses/draft-from-files",
            post(handlers::expenses::draft_from_files),
        )
        .route("/reports/purchases", get(handlers::purchases_report))
        .route("/reports/sales", get(handlers::sales_report))
        .route("/reports/gross-profit", get(handlers::gross_profit_report))
        .route("/reports/customers", get(handlers::customers_report))
        .route_layer(middleware::from_fn(staff_middleware))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}

/// Staff-only administration routes
fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/prices", get(handlers::list_prices))
        .route("/prices/reload", post(handlers::reload_prices))
        .route_layer(middleware::from_fn(staff_middleware))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
