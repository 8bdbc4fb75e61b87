use async_trait::async_trait;
use std::time::Duration;

use crate::observer::context::ObserverContext;
use crate::observer::error::ObserverError;
use crate::schema::ResourceDef;

/// Observer rings, executed in order before the store write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ObserverRing {
    DataPreparation = 0, // Load existing row, caller defaults
    InputValidation = 1, // Field coercion, required fields, references
    Business = 2,        // Uniqueness, domain rules
    Enrichment = 3,      // Server-stamped fields
}

impl ObserverRing {
    pub const ALL: [ObserverRing; 4] = [
        ObserverRing::DataPreparation,
        ObserverRing::InputValidation,
        ObserverRing::Business,
        ObserverRing::Enrichment,
    ];
}

/// Write operations routed through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Create,
    /// Full update (PUT): required fields must be present
    Update,
    /// Partial update (PATCH)
    Patch,
}

impl Operation {
    pub fn is_update(&self) -> bool {
        matches!(self, Operation::Update | Operation::Patch)
    }
}

#[async_trait]
pub trait Observer: Send + Sync {
    /// Observer name for logging and debugging
    fn name(&self) -> &'static str;

    fn ring(&self) -> ObserverRing;

    fn applies_to_operation(&self, _op: Operation) -> bool {
        true
    }

    fn applies_to_resource(&self, _def: &ResourceDef) -> bool {
        true
    }

    /// Execution timeout (default 5 seconds)
    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }

    /// Priority within ring (lower numbers execute first)
    fn priority(&self) -> u8 {
        50
    }

    async fn execute(&self, ctx: &mut ObserverContext) -> Result<(), ObserverError>;
}
