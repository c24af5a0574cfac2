pub mod blob;
pub mod daemon;
pub mod health;
pub mod init;
pub mod key;
pub mod version;

pub use blob::Blob;
pub use daemon::Daemon;
pub use health::Health;
pub use init::Init;
pub use key::Key;
pub use version::Version;
