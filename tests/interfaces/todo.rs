//! The todo-list domain used by the story: event types, payloads and a
//! reducer folding a todo's events into its current state.

use keyfan::Event;
use serde::{Deserialize, Serialize};

keyfan::event_types! {
    pub enum TodoEventType {
        Created => "TODO_CREATED",
        Deleted => "TODO_DELETED",
        Archived => "TODO_ARCHIVED",
        MarkedCompleted => "TODO_MARKED_COMPLETED",
        MarkedUncompleted => "TODO_MARKED_UNCOMPLETED",
        Assigned => "TODO_ASSIGNED",
    }
}

impl TodoEventType {
    pub fn parse(tag: &str) -> Option<Self> {
        serde_json::from_value(serde_json::Value::String(tag.to_string())).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TodoEvent {
    #[serde(rename = "TODO_CREATED")]
    Created {
        todo_id: String,
        list_id: String,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename = "TODO_DELETED")]
    Deleted {
        todo_id: String,
        list_id: String,
        deleted_by_user_id: String,
    },
    #[serde(rename = "TODO_ARCHIVED")]
    Archived {
        todo_id: String,
        list_id: String,
        archived_by_user_id: String,
    },
    #[serde(rename = "TODO_MARKED_COMPLETED")]
    MarkedCompleted {
        todo_id: String,
        list_id: String,
        completed_by_user_id: String,
    },
    #[serde(rename = "TODO_MARKED_UNCOMPLETED")]
    MarkedUncompleted {
        todo_id: String,
        list_id: String,
        uncompleted_by_user_id: String,
    },
    #[serde(rename = "TODO_ASSIGNED")]
    Assigned {
        todo_id: String,
        list_id: String,
        user_id: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TodoStatus {
    Incomplete,
    Complete,
    Archived,
}

impl TodoStatus {
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "incomplete" => Some(Self::Incomplete),
            "complete" => Some(Self::Complete),
            "archived" => Some(Self::Archived),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Todo {
    pub id: String,
    pub list_id: String,
    pub status: TodoStatus,
    pub assigned_to: Option<String>,
}

/// Fold one todo's events, oldest first. `None` if it never existed or was deleted.
pub fn reduce_todo(events: &[Event<TodoEventType>]) -> Option<Todo> {
    events.iter().fold(None, |todo, event| {
        let event: TodoEvent = event.to_domain().expect("stored event decodes");
        match event {
            TodoEvent::Created {
                todo_id, list_id, ..
            } => Some(Todo {
                id: todo_id,
                list_id,
                status: TodoStatus::Incomplete,
                assigned_to: None,
            }),
            TodoEvent::Assigned { user_id, .. } => todo.map(|todo| Todo {
                assigned_to: Some(user_id),
                ..todo
            }),
            TodoEvent::MarkedCompleted { .. } => todo.map(|todo| Todo {
                status: TodoStatus::Complete,
                ..todo
            }),
            TodoEvent::MarkedUncompleted { .. } => todo.map(|todo| Todo {
                status: TodoStatus::Incomplete,
                ..todo
            }),
            TodoEvent::Archived { .. } => todo.map(|todo| Todo {
                status: TodoStatus::Archived,
                ..todo
            }),
            TodoEvent::Deleted { .. } => None,
        }
    })
}
