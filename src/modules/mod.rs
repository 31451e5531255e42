//! Module descriptors, the module registry and load planning.

mod descriptor;
mod registry;
mod resolver;

pub use descriptor::{ModuleDescriptor, ModuleKind};
pub use registry::ModuleRegistry;
pub use resolver::{LoadPlan, resolve};
