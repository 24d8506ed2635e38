//! Builders to assemble and start a dispatcher.

pub mod dispatcher_builder;

pub use dispatcher_builder::DispatcherBuilder;
