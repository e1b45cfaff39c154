pub mod backend;
pub mod binaries;
pub mod config;
pub mod credentials;
pub mod fetcher;
pub mod observability;
pub mod remote;
pub mod secrets;
pub mod storage;
