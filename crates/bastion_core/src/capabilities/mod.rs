//! The capability library.
//!
//! One submodule per capability family: basic orders, building
//! construction, unit training, and upgrades. [`register_standard`] wires
//! every stock capability into a registry.

pub mod basic;
pub mod build;
pub mod train;
pub mod upgrade;

use crate::capability::CapabilityRegistry;

/// Register every stock capability. Registration silently skips names that
/// are already present, so calling this twice is harmless.
pub fn register_standard(registry: &mut CapabilityRegistry) {
    basic::register(registry);
    build::register(registry);
    train::register(registry);
    upgrade::register(registry);
}
