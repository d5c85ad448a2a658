pub mod clone;
pub mod message;
pub mod upload;
