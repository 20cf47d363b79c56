pub mod api;
pub mod cache;
pub mod config;
pub mod entrypoints;
pub mod pipeline;
pub mod pulls;
pub mod state;

#[cfg(test)]
mod tests;
