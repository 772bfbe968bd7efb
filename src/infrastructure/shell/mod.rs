pub mod context;
pub mod quote;

pub use context::{CommandOutput, ExecutionContext, LocalContext, SshContext};
pub use quote::{quote_path, shell_quote};
