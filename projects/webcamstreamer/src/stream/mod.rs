pub mod ffmpeg_backend;
pub mod service;
pub mod traits;
