pub mod channel;
pub mod cli;
pub mod config;
pub mod dispatch;
pub mod ingest;
pub mod queue;
pub mod record;
