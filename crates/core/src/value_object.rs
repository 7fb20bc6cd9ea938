//! Value object trait: equality by value, not identity.
//!
//! Value objects are domain objects that have **no identity**. Query parameters
//! such as a sort direction or a period filter are the typical case here: two
//! filters for June 2024 are interchangeable.

/// Marker trait for value objects.
///
/// ## Value Object vs Entity
///
/// - **Value Object**: No identity (two value objects with same values are equal)
/// - **Entity**: Has identity (a voucher stays the same voucher after its history is reshaped)
///
/// ## Design Constraints
///
/// The trait requires:
/// - **Clone**: value objects are cheap to copy
/// - **PartialEq**: value objects are compared by their attribute values
/// - **Debug**: value objects show up in logs and test failures
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
