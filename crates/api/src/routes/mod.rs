pub mod groups;
pub mod health;
pub mod metrics;
