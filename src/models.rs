pub mod auth;
pub mod contact;
pub mod folder;
pub mod package;
pub mod post;
