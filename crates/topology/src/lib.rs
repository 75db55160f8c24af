//! Compiles a validated [`tracesynth_model::TopologyConfig`] into an
//! immutable, index-addressed operation graph: every call target resolved,
//! every attribute generator compiled, domain defaults merged in.

mod build;
mod registry;

pub use build::{Call, Operation, Topology, TopologyError, UnknownDomainWrapper};
pub use registry::{SemanticConventionRegistry, StaticRegistry, UnknownDomain};
