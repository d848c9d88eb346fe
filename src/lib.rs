pub mod agent;
pub mod evidence;
pub mod extractor;
pub mod llm;
pub mod planner;
pub mod serper;
pub mod server;
pub mod types;
