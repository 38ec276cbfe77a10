pub mod concat;
pub mod error;
pub mod join;
pub mod naming;
pub mod progress;
pub mod publish;
pub mod repair;
pub mod tool;
pub mod workspace;

pub use error::{JoinError, JoinResult};
pub use join::Joiner;
pub use progress::ProgressMode;
pub use tool::ExternalTool;
