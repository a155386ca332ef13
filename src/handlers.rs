pub mod auth;
pub mod feed;
pub mod folders;
pub mod packages;
pub mod posts;
pub mod users;
