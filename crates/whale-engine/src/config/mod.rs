//! Connections file parsing, validation, well-known paths and the key-value
//! configuration handed to tasks.

pub mod parser;
pub mod paths;
pub mod store;
pub mod validator;

pub use paths::WhalePaths;
pub use store::Configuration;
