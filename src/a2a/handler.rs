//! JSON-RPC request handler for the A2A surface.
//!
//! Methods: `message/send`, `message/stream` (SSE, wired up in `api`),
//! `tasks/get`, `tasks/cancel`.

use std::sync::Arc;

use futures::Stream;
use tracing::{error, info};

use crate::agent::NotionAgent;

use super::task_store::InMemoryTaskStore;
use super::types::*;

/// Dispatches A2A requests to the agent and the task store.
pub struct RequestHandler {
    agent: Arc<NotionAgent>,
    tasks: Arc<InMemoryTaskStore>,
}

impl RequestHandler {
    pub fn new(agent: Arc<NotionAgent>, tasks: Arc<InMemoryTaskStore>) -> Self {
        Self { agent, tasks }
    }

    /// Handle a non-streaming request.
    pub async fn dispatch(&self, request: A2aRequest) -> A2aResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "message/send" => match serde_json::from_value::<MessageSendParams>(request.params) {
                Ok(params) => {
                    let task = self.message_send(params).await;
                    match serde_json::to_value(&task) {
                        Ok(value) => A2aResponse::success(id, value),
                        Err(e) => A2aResponse::error(id, INVALID_REQUEST, e.to_string()),
                    }
                }
                Err(e) => A2aResponse::error(id, INVALID_PARAMS, e.to_string()),
            },
            "tasks/get" => match serde_json::from_value::<TaskIdParams>(request.params) {
                Ok(params) => match self.tasks.get(&params.id).await {
                    Some(task) => {
                        A2aResponse::success(id, serde_json::to_value(&task).unwrap_or_default())
                    }
                    None => A2aResponse::error(
                        id,
                        TASK_NOT_FOUND,
                        format!("Task {} not found", params.id),
                    ),
                },
                Err(e) => A2aResponse::error(id, INVALID_PARAMS, e.to_string()),
            },
            "tasks/cancel" => match serde_json::from_value::<TaskIdParams>(request.params) {
                Ok(params) => self.cancel_task(id, &params.id).await,
                Err(e) => A2aResponse::error(id, INVALID_PARAMS, e.to_string()),
            },
            other => A2aResponse::error(
                id,
                METHOD_NOT_FOUND,
                format!("Unknown method: {other}"),
            ),
        }
    }

    /// Run a message through the agent, tracking it as a task.
    async fn message_send(&self, params: MessageSendParams) -> Task {
        let task = Task::submitted(params.message);
        let task_id = task.id.clone();
        info!("Task {} submitted", task_id);

        self.tasks.insert(task.clone()).await;
        let _ = self
            .tasks
            .update(&task_id, |t| {
                t.status = TaskStatus::new(TaskState::Working);
            })
            .await;

        let user_text = task.history[0].text();
        let outcome = self.agent.run(&user_text).await;

        let resolved = self
            .tasks
            .update(&task_id, |t| match &outcome {
                Ok(reply) => {
                    let mut message = Message::agent(reply.clone());
                    message.task_id = Some(t.id.clone());
                    message.context_id = Some(t.context_id.clone());
                    t.history.push(message);
                    t.status = TaskStatus::new(TaskState::Completed);
                }
                Err(e) => {
                    error!("Task {} failed: {}", t.id, e);
                    let mut message = Message::agent(e.to_string());
                    message.task_id = Some(t.id.clone());
                    message.context_id = Some(t.context_id.clone());
                    t.status = TaskStatus::new(TaskState::Failed).with_message(message);
                }
            })
            .await;

        match resolved {
            Ok(task) => {
                info!("Task {} resolved: {:?}", task.id, task.status.state);
                task
            }
            // The task cannot vanish mid-request; fall back to the submitted copy.
            Err(_) => task,
        }
    }

    /// Cancel a task if it has not already reached a terminal state.
    async fn cancel_task(&self, id: serde_json::Value, task_id: &str) -> A2aResponse {
        let Some(task) = self.tasks.get(task_id).await else {
            return A2aResponse::error(id, TASK_NOT_FOUND, format!("Task {task_id} not found"));
        };

        if task.status.state.is_terminal() {
            return A2aResponse::error(
                id,
                TASK_NOT_CANCELABLE,
                format!("Task {} is {:?}", task_id, task.status.state),
            );
        }

        match self
            .tasks
            .update(task_id, |t| {
                t.status = TaskStatus::new(TaskState::Canceled);
            })
            .await
        {
            Ok(task) => A2aResponse::success(id, serde_json::to_value(&task).unwrap_or_default()),
            Err(e) => A2aResponse::error(id, TASK_NOT_FOUND, e.to_string()),
        }
    }

    /// Handle `message/stream`: the task plus status updates as they happen.
    ///
    /// Yields JSON-RPC responses suitable for SSE data frames: the submitted
    /// task, a working update, then the final update.
    pub fn message_stream(
        &self,
        id: serde_json::Value,
        params: MessageSendParams,
    ) -> impl Stream<Item = A2aResponse> {
        let agent = Arc::clone(&self.agent);
        let tasks = Arc::clone(&self.tasks);

        async_stream::stream! {
            let task = Task::submitted(params.message);
            let task_id = task.id.clone();
            tasks.insert(task.clone()).await;
            yield A2aResponse::success(
                id.clone(),
                serde_json::to_value(&task).unwrap_or_default(),
            );

            let working = tasks
                .update(&task_id, |t| {
                    t.status = TaskStatus::new(TaskState::Working);
                })
                .await;
            if let Ok(working) = &working {
                let event = TaskStatusUpdateEvent::new(working, false);
                yield A2aResponse::success(
                    id.clone(),
                    serde_json::to_value(&event).unwrap_or_default(),
                );
            }

            let user_text = task.history[0].text();
            let outcome = agent.run(&user_text).await;

            let resolved = tasks
                .update(&task_id, |t| match &outcome {
                    Ok(reply) => {
                        let mut message = Message::agent(reply.clone());
                        message.task_id = Some(t.id.clone());
                        message.context_id = Some(t.context_id.clone());
                        t.history.push(message);
                        t.status = TaskStatus::new(TaskState::Completed);
                    }
                    Err(e) => {
                        let mut message = Message::agent(e.to_string());
                        message.task_id = Some(t.id.clone());
                        message.context_id = Some(t.context_id.clone());
                        t.status = TaskStatus::new(TaskState::Failed).with_message(message);
                    }
                })
                .await;

            if let Ok(resolved) = resolved {
                let event = TaskStatusUpdateEvent::new(&resolved, true);
                yield A2aResponse::success(
                    id,
                    serde_json::to_value(&event).unwrap_or_default(),
                );
            }
        }
    }
}
