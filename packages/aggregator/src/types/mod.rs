pub mod config;
pub mod criteria;
pub mod job;
pub mod seen;
pub mod source;
