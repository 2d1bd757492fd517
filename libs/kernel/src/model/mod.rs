mod base;
mod memory;
mod users;

pub use base::*;
pub use memory::*;
pub use users::*;
