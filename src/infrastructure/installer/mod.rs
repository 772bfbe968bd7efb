pub mod planner;
pub mod utils;
pub mod verifier;

pub use planner::{plan_install, ArchiveKind, InstallPlan};
pub use utils::{create_progress_bar, file_digest, FileDigest};
pub use verifier::{execute_plan, is_installed, rollback};
