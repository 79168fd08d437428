mod allocator;
mod buffer;
mod checked;
mod pool;


pub use allocator::*;
pub use buffer::*;
pub use checked::*;
pub use pool::*;
