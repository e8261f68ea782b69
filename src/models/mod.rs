pub mod email;
pub mod health;
pub mod message;
pub mod queue;
pub mod request;
pub mod response;
pub mod status;
pub mod validation;
