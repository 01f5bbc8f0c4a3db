mod base;
mod generate;
mod retry;

pub use base::*;
pub use generate::*;
pub use retry::*;
