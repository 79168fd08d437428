pub mod builder;
pub mod factory;
pub mod lifecycle;
pub mod memory;
mod util;


pub use builder::{AnyBuilder, ArrayBuilder, ValidityBuilder};
pub use factory::{make_builder, make_field_builder, BuilderFactory};
pub use lifecycle::{RefCount, SharedBuilder};
pub use memory::{default_allocator, AllocError, Allocator, AllocatorRef};
