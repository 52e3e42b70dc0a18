pub mod job;
pub mod tryon;
