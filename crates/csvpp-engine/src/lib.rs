pub mod builtins;
pub mod engine;
