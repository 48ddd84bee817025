// ============================================================================
// Domain Layer - Business Rules
// ============================================================================
//
// Rules an incoming order must satisfy before it is stored. Kept free of any
// transport or storage concern.
//
// ============================================================================

pub mod order;
