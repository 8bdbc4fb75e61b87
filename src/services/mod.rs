pub mod representation;
pub mod resource_service;

pub use resource_service::{LedgerSummary, ResourceService};
