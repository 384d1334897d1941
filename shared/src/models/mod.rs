//! Domain models for ConServ

mod estimate;
mod expense;
mod material;
mod order;
mod purchase;
mod sales;
mod user;

pub use estimate::*;
pub use expense::*;
pub use material::*;
pub use order::*;
pub use purchase::*;
pub use sales::*;
pub use user::*;
