//! Business logic services for ConServ

pub mod auth;
pub mod checkout;
pub mod delivery;
pub mod estimator;
pub mod expenses;
pub mod purchases;
pub mod reporting;
pub mod sales;
pub mod uploads;

pub use auth::AuthService;
pub use checkout::CheckoutService;
pub use delivery::DeliveryService;
pub use estimator::EstimatorService;
pub use expenses::ExpenseService;
pub use purchases::PurchaseService;
pub use reporting::ReportingService;
pub use sales::SalesService;
pub use uploads::UploadService;
