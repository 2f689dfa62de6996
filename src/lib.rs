pub mod article;
pub mod cache;
pub mod config;
pub mod enrich;
pub mod environment;
pub mod logging;
pub mod normalize;
pub mod orchestrator;
pub mod pipeline;
pub mod sources;
pub mod web;

pub const TARGET_WEB_REQUEST: &str = "web_request";
pub const TARGET_LLM_REQUEST: &str = "llm_request";
pub const TARGET_CACHE: &str = "cache";
pub const TARGET_RANK: &str = "rank";
