pub mod auth;
pub mod authorization;
pub mod contact_service;
pub mod feed_service;
pub mod folder_service;
pub mod package_service;
pub mod post_service;
