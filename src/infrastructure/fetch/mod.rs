//! Page fetching adapters.

pub mod http_fetcher;

pub use http_fetcher::HttpPageFetcher;
