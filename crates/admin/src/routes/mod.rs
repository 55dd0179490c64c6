pub mod config;
pub mod health;
pub mod logs;
pub mod metrics;
pub mod rules;
pub mod stats;
