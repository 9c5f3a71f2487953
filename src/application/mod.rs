//! Application services layer.

pub mod auth;
pub mod comments;
pub mod error;
pub mod feed;
pub mod pagination;
pub mod posts;
pub mod repos;
pub mod search;
pub mod tags;
pub mod users;
