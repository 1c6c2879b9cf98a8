pub mod appspec;
pub mod config;
pub mod jobs;
pub mod services;
pub mod shared;
pub mod workflow;
