pub mod api;
pub mod attachments;
pub mod config;
pub mod deploy;
pub mod errors;
pub mod generator;
pub mod github;
pub mod notify;
pub mod server;

#[cfg(test)]
mod test_support;
