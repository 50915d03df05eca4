//! Domain types for provisioning the marketplace product database.
//!
//! Nothing here talks to a server: [`plan`] describes what gets created and
//! [`catalog`] generates the product documents used for seeding.

pub mod catalog;
pub mod plan;
pub mod product;

pub use catalog::CatalogGenerator;
pub use plan::{CollectionSpec, DatabaseUser, IndexKind, IndexSpec, ProvisionPlan, RoleGrant};
pub use product::{Price, Product};
