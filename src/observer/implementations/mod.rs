// Observer implementations organized by rings

// Ring 0: Data Preparation - load stored row, caller defaults
#[path = "0/data_preparation.rs"]
pub mod data_preparation;

// Ring 1: Input Validation - coercion, required fields, references
#[path = "1/field_validation.rs"]
pub mod field_validation;
#[path = "1/reference_validation.rs"]
pub mod reference_validation;

// Ring 2: Business - uniqueness and domain rules
#[path = "2/onboarding_product_name.rs"]
pub mod onboarding_product_name;
#[path = "2/password_hash.rs"]
pub mod password_hash;
#[path = "2/unique_fields.rs"]
pub mod unique_fields;

// Ring 3: Enrichment - server-stamped fields
#[path = "3/timestamps.rs"]
pub mod timestamps;

pub use data_preparation::DataPreparationObserver;
pub use field_validation::FieldValidationObserver;
pub use onboarding_product_name::OnboardingProductNameObserver;
pub use password_hash::PasswordHashObserver;
pub use reference_validation::ReferenceValidationObserver;
pub use timestamps::TimestampsObserver;
pub use unique_fields::UniqueFieldsObserver;

use crate::observer::pipeline::ObserverPipeline;

pub fn register_all(pipeline: &mut ObserverPipeline) {
    pipeline.register_observer(Box::new(DataPreparationObserver));
    pipeline.register_observer(Box::new(FieldValidationObserver));
    pipeline.register_observer(Box::new(ReferenceValidationObserver));
    pipeline.register_observer(Box::new(UniqueFieldsObserver));
    pipeline.register_observer(Box::new(OnboardingProductNameObserver));
    pipeline.register_observer(Box::new(PasswordHashObserver));
    pipeline.register_observer(Box::new(TimestampsObserver));
}
