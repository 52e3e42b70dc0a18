pub mod auth;
pub mod fetch;
pub mod jobs;
pub mod prompt;
pub mod provider;
pub mod storage;
