pub mod policy;
pub mod server;
pub mod token;
