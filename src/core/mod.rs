pub mod context;
pub mod engine;
pub mod normalizer;
pub mod scorer;
pub mod streamer;
pub mod table;
pub mod types;
