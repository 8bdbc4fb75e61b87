pub mod db;
pub mod permission;
pub mod tenant;
pub mod token;
pub mod user;
