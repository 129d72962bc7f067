mod hooks;
mod ipc;
mod parents;
mod session;
mod toolbox;
pub(crate) mod validate;

pub use ipc::{handle_message, parse_ipc_message};
pub use parents::ParentCandidates;
pub use session::EditorSession;
