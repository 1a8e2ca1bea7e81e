mod manual_clock;
mod revocation_store_memory;

pub use manual_clock::*;
pub use revocation_store_memory::*;
