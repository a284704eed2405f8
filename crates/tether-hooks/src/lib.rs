pub mod approval;
pub mod context;
pub mod guard;
pub mod pipeline;
pub mod prompt;
pub mod rejection;
pub mod session;
pub mod tool;

pub use approval::{ApprovalGate, ApprovalRequest, Decision};
pub use context::{Message, Payload};
pub use guard::{ConcurrencyGuard, GuardStatus};
pub use pipeline::{Authorized, HookPipeline, PostOutcome, PostState};
pub use rejection::{Rejection, RejectionKind};
pub use session::Session;
pub use tool::{ToolCall, ToolClass, WriteArgs};
