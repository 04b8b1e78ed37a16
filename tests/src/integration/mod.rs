//! Cross-component integration scenarios.

#[cfg(test)]
mod fixtures;

mod connection_loss;
mod queries;
mod registry;
mod submission_flows;
