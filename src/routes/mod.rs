//! Route descriptors and the immutable route table.
//!
//! Route sources are merged once at startup into a table keyed by
//! `"<METHOD> <path>"`. The table is read-only after construction and shared
//! across every in-flight request without synchronization; the only mutable
//! artifact of construction is the dispatcher, which receives one responder
//! coroutine per registered route.

mod descriptor;
mod table;

pub use descriptor::{PrepareFn, ResponderFn, RouteDescriptor};
pub use table::{endpoint_key, RouteEntry, RouteTable};
