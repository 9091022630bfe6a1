pub mod future;
pub mod stream;
pub mod timer;
