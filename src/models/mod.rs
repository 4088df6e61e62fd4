pub mod catalog;
pub mod job;
pub mod partner;
pub mod slack;
pub mod upload;
