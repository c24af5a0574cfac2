pub mod args;
pub mod op;
pub mod ops;

pub use ops::{Blob, Daemon, Health, Init, Key, Version};
