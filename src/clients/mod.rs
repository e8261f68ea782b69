pub mod dlq;
pub mod email;
pub mod health;
pub mod queue;
pub mod topic;
