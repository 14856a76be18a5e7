//! Data module for file-backed property defaults

mod defaults;

pub use defaults::DefaultsProfile;
