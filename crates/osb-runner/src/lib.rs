//! The runner registry, wrapper decorators, composite runner and built-in
//! operation catalogue. Built atop the seam traits defined in `osb-core`
//! (`Runner`, `ClusterClient`, `Params`, `Meta`).

pub mod composite;
pub mod composite_context;
pub mod ops;
pub mod registry;
pub mod registry_builtin;
pub mod wrappers;

pub use composite::Composite;
pub use registry::Registry;
pub use registry_builtin::install_builtin_runners;
