// Library interface for telepress modules
// This allows tests and other binaries to import modules

pub mod deliver;
pub mod fetch;
pub mod filter;
pub mod pipeline;
pub mod store;
pub mod translate;
