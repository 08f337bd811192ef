pub mod api_client;
pub mod config;
pub mod data_processor;
pub mod export;
pub mod feed;
pub mod http_cache;
pub mod mock_api;
pub mod persist;
pub mod recommender;
pub mod state;
