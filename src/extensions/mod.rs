//! # Extensions and their registry.
//!
//! - [`Extension`] - feature with `boot`/`shutdown`
//! - [`ExtensionRef`] - shared handle (`Arc<dyn Extension>`)
//! - [`NoopExtension`] - does nothing
//! - [`Registry`] - ordered, boot-once registry (isolated or process-wide)

mod extension;
mod registry;

pub use extension::{Extension, ExtensionRef, NoopExtension};
pub use registry::Registry;
