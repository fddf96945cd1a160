//! Predicate compiler: serializable filter criteria in, an ORM-agnostic
//! predicate tree out.
//!
//! Entity models are declared up front as [`EntitySchema`] descriptors in a
//! [`SchemaRegistry`] (property name → strategy kind), replacing runtime
//! reflection with O(1) lookup. The [`Compiler`] walks a filter list once,
//! dispatches each criterion to a kind-specific strategy and folds the
//! results left-to-right per filter operator. Unresolvable criteria are
//! dropped with a diagnostic in the default lenient mode; strict mode turns
//! them into errors.

pub mod compile;
pub mod schema;

pub use compile::{CompileError, CompileMode, CompileOptions, CompileResult, Compiler};
pub use schema::{EntitySchema, PropertyKind, SchemaRegistry};
