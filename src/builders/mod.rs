//! Builders to construct task properties from configuration.

pub mod property_builder;

pub use property_builder::TaskPropertyBuilder;
