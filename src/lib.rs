pub mod db;
pub mod model;
pub mod notice;
pub mod output;
pub mod paths;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod timespec;
pub mod trigger;
pub mod validate;
