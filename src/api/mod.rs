pub mod auth;
pub mod client;
pub mod comments;
pub mod communities;
pub mod feed;
pub mod posts;
pub mod projects;

pub use client::ApiClient;
pub use feed::FeedQuery;
pub use projects::ProjectQuery;
