pub mod checkpoint;
pub mod health;
pub mod metrics;
pub mod policy;
pub mod record;
