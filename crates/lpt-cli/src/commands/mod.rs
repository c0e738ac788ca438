pub mod auth_cmd;
pub mod common;
pub mod data;
pub mod remote;
pub mod status;
pub mod sync;
