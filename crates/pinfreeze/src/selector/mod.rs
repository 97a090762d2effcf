// ABOUTME: Selector contracts and the queries they compile to.
// ABOUTME: Covers the typed (kind, value) contract, legacy selector strings and the XPath subset.

//! Selector module.
//!
//! A capture selector is a typed `(kind, value)` pair. Contracts are validated
//! when written, converted from the legacy string form when read, and compiled
//! into a [`Query`] before they touch a parsed document.
//!
//! Submodules:
//! - `contract`: `SelectorKind`, `SelectorContract` and legacy conversion.
//! - `query`: compilation of a contract into a structured tree query.
//! - `xpath`: the restricted XPath grammar used by the `xpath` kind.

pub mod contract;
pub mod query;
pub mod xpath;

pub use contract::{Selector, SelectorContract, SelectorKind};
pub use query::Query;
pub use xpath::XPath;
