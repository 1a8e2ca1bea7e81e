// store

mod revocation_store;

pub use revocation_store::*;

// time

mod clock;

pub use clock::*;
