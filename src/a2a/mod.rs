//! Agent-to-agent (A2A) protocol layer.
//!
//! JSON-RPC 2.0 over HTTP POST, an agent card at a well-known path, and an
//! in-memory task registry. The HTTP wiring itself lives in `api`.

mod handler;
mod task_store;
mod types;

pub use handler::RequestHandler;
pub use task_store::InMemoryTaskStore;
pub use types::{
    A2aError, A2aRequest, A2aResponse, AgentCapabilities, AgentCard, AgentSkill, Message,
    MessageRole, MessageSendParams, Part, Task, TaskIdParams, TaskState, TaskStatus,
    TaskStatusUpdateEvent, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
    TASK_NOT_CANCELABLE, TASK_NOT_FOUND,
};
