pub mod feed;
pub mod fetch;

pub use feed::FeedMessage;
pub use fetch::FeedFetcher;
