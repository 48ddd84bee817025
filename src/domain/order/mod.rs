// ============================================================================
// Order Domain - Business Rules for Incoming Orders
// ============================================================================
//
// - Errors (ValidationErrors, Violation, Rule)
// - Validation (validate_order)
//
// Orders are immutable once accepted, so the domain is only the set of
// invariants an order must satisfy before it is persisted.
//
// ============================================================================

pub mod errors;
pub mod validation;

pub use errors::*;
pub use validation::*;
