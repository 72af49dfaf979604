//! Declarative route table for the storefront client.
//!
//! # Data Flow
//! ```text
//! navigate(path)
//!     → parse path + query
//!     → table lookup (most specific pattern wins, fallback last)
//!     → guards of each matched entry, in order (first denial aborts)
//!     → lazy child tables load once, lookup continues in the child
//!     → previous route's state slices torn down, new slices installed
//!     → view resolver runs once
//!     → ActivatedRoute
//! ```
//!
//! # Design Decisions
//! - Tables are built once and immutable afterwards
//! - No regex: segments are static, `:param`, or the `**` wildcard
//! - A denied navigation never touches the active route or any resolver

pub mod guard;
pub mod pattern;
mod router;
pub mod slices;
pub mod table;

pub use guard::{FnGuard, GuardDecision, NavigationRequest, RouteGuard};
pub use pattern::{PathPattern, PatternError, RouteParams};
pub use router::{ActivatedRoute, NavigationError, NavigationOutcome, RouteSnapshot, Router};
pub use slices::{SliceProvider, SliceScope, StateRegistry, StateSlice};
pub use table::{RouteEntry, RouteTable, RouteTableBuilder};
