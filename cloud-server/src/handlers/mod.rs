//! HTTP handlers

pub mod health;
pub mod messages;
pub mod metrics;
pub mod slots;

#[cfg(test)]
mod tests;
