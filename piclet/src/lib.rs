pub mod batch;
pub mod config;
pub mod error;
pub mod identity;
pub mod io;
pub mod layout;
pub mod pdk;
pub mod piclet;
pub mod verification;

pub(crate) mod log;
