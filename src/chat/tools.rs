use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::MySqlPool;

use crate::shared::models::{StatusFilter, Task, TaskLookup, UpdateTaskRequest};

/// The fixed set of tools the model may call. Closed enum: an unknown name
/// from the model falls through to one explicit error result instead of an
/// open-ended lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    AddTask,
    ListTasks,
    UpdateTask,
    DeleteTask,
    GetTaskDetails,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::AddTask,
        ToolKind::ListTasks,
        ToolKind::UpdateTask,
        ToolKind::DeleteTask,
        ToolKind::GetTaskDetails,
    ];

    pub fn from_name(name: &str) -> Option<ToolKind> {
        match name {
            "add_task" => Some(ToolKind::AddTask),
            "list_tasks" => Some(ToolKind::ListTasks),
            "update_task" => Some(ToolKind::UpdateTask),
            "delete_task" => Some(ToolKind::DeleteTask),
            "get_task_details" => Some(ToolKind::GetTaskDetails),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::AddTask => "add_task",
            ToolKind::ListTasks => "list_tasks",
            ToolKind::UpdateTask => "update_task",
            ToolKind::DeleteTask => "delete_task",
            ToolKind::GetTaskDetails => "get_task_details",
        }
    }

    /// Declaration consumed by the provider. Names and required fields are a
    /// wire contract; changing them breaks the model's ability to call the
    /// tool.
    pub fn declaration(self) -> Value {
        match self {
            ToolKind::AddTask => json!({
                "type": "function",
                "function": {
                    "name": "add_task",
                    "description": "Create a new task for the user. Use this only when the user wants to add a new task, not to update or complete an existing one.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "title": {"type": "string", "description": "The title of the new task"},
                            "description": {"type": "string", "description": "Optional description of the new task"},
                            "user_id": {"type": "string", "description": "The ID of the user who owns the task. Always provide this."}
                        },
                        "required": ["title", "user_id"]
                    }
                }
            }),
            ToolKind::ListTasks => json!({
                "type": "function",
                "function": {
                    "name": "list_tasks",
                    "description": "List all tasks for the user with optional filtering. Use this when the user wants to see their tasks or get an overview.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "user_id": {"type": "string", "description": "The ID of the user whose tasks to list. Always provide this."},
                            "status": {"type": "string", "description": "Optional status filter ('all', 'completed', 'pending')"}
                        },
                        "required": ["user_id"]
                    }
                }
            }),
            ToolKind::UpdateTask => json!({
                "type": "function",
                "function": {
                    "name": "update_task",
                    "description": "Update an existing task for the user. Use this when the user wants to mark a task as complete, change its title, description, or any other property. The task_id is required.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "task_id": {"type": "integer", "description": "The ID of the task to update. This is required for any update operation."},
                            "user_id": {"type": "string", "description": "The ID of the user who owns the task. Always provide this."},
                            "title": {"type": "string", "description": "New title (optional)"},
                            "description": {"type": "string", "description": "New description (optional)"},
                            "completed": {"type": "boolean", "description": "New completion status (true for completed, false for incomplete). Use this specifically to mark tasks as complete/incomplete."}
                        },
                        "required": ["task_id", "user_id"]
                    }
                }
            }),
            ToolKind::DeleteTask => json!({
                "type": "function",
                "function": {
                    "name": "delete_task",
                    "description": "Delete a task for the user. Use this only when the user explicitly asks to delete a task.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "task_id": {"type": "integer", "description": "The ID of the task to delete"},
                            "user_id": {"type": "string", "description": "The ID of the user who owns the task. Always provide this."}
                        },
                        "required": ["task_id", "user_id"]
                    }
                }
            }),
            ToolKind::GetTaskDetails => json!({
                "type": "function",
                "function": {
                    "name": "get_task_details",
                    "description": "Get detailed information about a specific task. Use this when the user wants details about a particular task.",
                    "parameters": {
                        "type": "object",
                        "properties": {
                            "task_id": {"type": "integer", "description": "The ID of the task to get details for"},
                            "user_id": {"type": "string", "description": "The ID of the user who owns the task. Always provide this."}
                        },
                        "required": ["task_id", "user_id"]
                    }
                }
            }),
        }
    }
}

pub fn declarations() -> Vec<Value> {
    ToolKind::ALL.iter().map(|kind| kind.declaration()).collect()
}

#[derive(Debug, Deserialize)]
struct AddTaskArgs {
    title: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListTasksArgs {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateTaskArgs {
    task_id: i64,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    completed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct TaskRefArgs {
    task_id: i64,
    #[serde(default)]
    user_id: Option<String>,
}

/// Execute one tool call. Every outcome is a value: `{"success": true, ...}`
/// or `{"error": "..."}`. Nothing here aborts the turn.
pub async fn dispatch(pool: &MySqlPool, name: &str, args: &Value) -> Value {
    match ToolKind::from_name(name) {
        Some(ToolKind::AddTask) => add_task(pool, args).await,
        Some(ToolKind::ListTasks) => list_tasks(pool, args).await,
        Some(ToolKind::UpdateTask) => update_task(pool, args).await,
        Some(ToolKind::DeleteTask) => delete_task(pool, args).await,
        Some(ToolKind::GetTaskDetails) => get_task_details(pool, args).await,
        None => json!({"error": format!("Unknown tool: {}", name)}),
    }
}

fn require_owner(user_id: Option<String>) -> std::result::Result<String, Value> {
    user_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| json!({"error": "user_id is required"}))
}

fn invalid_args(tool: &str, err: serde_json::Error) -> Value {
    json!({"error": format!("Invalid arguments for {}: {}", tool, err)})
}

fn task_summary(task: &Task) -> Value {
    json!({
        "id": task.id,
        "title": task.title,
        "description": task.description,
        "completed": task.completed,
        "created_at": task.created_at.to_rfc3339(),
    })
}

async fn add_task(pool: &MySqlPool, args: &Value) -> Value {
    let parsed: AddTaskArgs = match serde_json::from_value(args.clone()) {
        Ok(parsed) => parsed,
        Err(e) => return invalid_args("add_task", e),
    };
    let user_id = match require_owner(parsed.user_id) {
        Ok(user_id) => user_id,
        Err(error) => return error,
    };

    match Task::create(pool, &user_id, &parsed.title, parsed.description.as_deref()).await {
        Ok(task) => json!({
            "success": true,
            "message": format!("Task '{}' has been added successfully", task.title),
            "task_id": task.id,
            "task_title": task.title,
        }),
        Err(e) => json!({"error": format!("Failed to add task: {}", e)}),
    }
}

async fn list_tasks(pool: &MySqlPool, args: &Value) -> Value {
    let parsed: ListTasksArgs = match serde_json::from_value(args.clone()) {
        Ok(parsed) => parsed,
        Err(e) => return invalid_args("list_tasks", e),
    };
    let user_id = match require_owner(parsed.user_id) {
        Ok(user_id) => user_id,
        Err(error) => return error,
    };

    let filter = StatusFilter::from_arg(parsed.status.as_deref());
    match Task::list_for_owner(pool, &user_id, filter).await {
        Ok(tasks) => {
            let task_list: Vec<Value> = tasks.iter().map(task_summary).collect();
            json!({
                "success": true,
                "tasks": task_list,
                "count": task_list.len(),
                "message": format!("Found {} tasks", task_list.len()),
            })
        }
        Err(e) => json!({"error": format!("Failed to list tasks: {}", e)}),
    }
}

async fn update_task(pool: &MySqlPool, args: &Value) -> Value {
    let parsed: UpdateTaskArgs = match serde_json::from_value(args.clone()) {
        Ok(parsed) => parsed,
        Err(e) => return invalid_args("update_task", e),
    };
    let user_id = match require_owner(parsed.user_id) {
        Ok(user_id) => user_id,
        Err(error) => return error,
    };

    let changes = UpdateTaskRequest {
        title: parsed.title.clone(),
        description: parsed.description.clone(),
        completed: parsed.completed,
    };

    match Task::update_for_owner(pool, parsed.task_id, &user_id, &changes).await {
        Ok(TaskLookup::Found(task)) => json!({
            "success": true,
            "message": format!("Task '{}' has been updated successfully", task.title),
            "task_id": task.id,
            "updated_fields": {
                "title": parsed.title,
                "description": parsed.description,
                "completed": parsed.completed,
            },
        }),
        Ok(TaskLookup::Missing) => {
            json!({"error": format!("Task with ID {} not found", parsed.task_id)})
        }
        Ok(TaskLookup::Denied) => {
            json!({"error": "Access denied: You can only update your own tasks"})
        }
        Err(e) => json!({"error": format!("Failed to update task: {}", e)}),
    }
}

async fn delete_task(pool: &MySqlPool, args: &Value) -> Value {
    let parsed: TaskRefArgs = match serde_json::from_value(args.clone()) {
        Ok(parsed) => parsed,
        Err(e) => return invalid_args("delete_task", e),
    };
    let user_id = match require_owner(parsed.user_id) {
        Ok(user_id) => user_id,
        Err(error) => return error,
    };

    match Task::delete_for_owner(pool, parsed.task_id, &user_id).await {
        Ok(TaskLookup::Found(task)) => json!({
            "success": true,
            "message": format!("Task '{}' has been deleted successfully", task.title),
            "deleted_task_id": parsed.task_id,
        }),
        Ok(TaskLookup::Missing) => {
            json!({"error": format!("Task with ID {} not found", parsed.task_id)})
        }
        Ok(TaskLookup::Denied) => {
            json!({"error": "Access denied: You can only delete your own tasks"})
        }
        Err(e) => json!({"error": format!("Failed to delete task: {}", e)}),
    }
}

async fn get_task_details(pool: &MySqlPool, args: &Value) -> Value {
    let parsed: TaskRefArgs = match serde_json::from_value(args.clone()) {
        Ok(parsed) => parsed,
        Err(e) => return invalid_args("get_task_details", e),
    };
    let user_id = match require_owner(parsed.user_id) {
        Ok(user_id) => user_id,
        Err(error) => return error,
    };

    match Task::find_for_owner(pool, parsed.task_id, &user_id).await {
        Ok(TaskLookup::Found(task)) => json!({
            "success": true,
            "task": {
                "id": task.id,
                "title": task.title,
                "description": task.description,
                "completed": task.completed,
                "created_at": task.created_at.to_rfc3339(),
                "updated_at": task.updated_at.to_rfc3339(),
            },
        }),
        Ok(TaskLookup::Missing) => {
            json!({"error": format!("Task with ID {} not found", parsed.task_id)})
        }
        Ok(TaskLookup::Denied) => {
            json!({"error": "Access denied: You can only access your own tasks"})
        }
        Err(e) => json!({"error": format!("Failed to get task details: {}", e)}),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_the_registry() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("drop_database"), None);
    }

    #[test]
    fn declarations_expose_all_five_tools() {
        let decls = declarations();
        assert_eq!(decls.len(), 5);
        for decl in &decls {
            assert_eq!(decl["type"], "function");
            let function = &decl["function"];
            assert!(function["name"].is_string());
            assert!(function["parameters"]["required"]
                .as_array()
                .unwrap()
                .iter()
                .any(|field| field == "user_id"));
        }
    }

    #[test]
    fn add_task_args_accept_optional_description() {
        let parsed: AddTaskArgs =
            serde_json::from_value(json!({"title": "buy milk", "user_id": "u1"})).unwrap();
        assert_eq!(parsed.title, "buy milk");
        assert!(parsed.description.is_none());
    }

    #[test]
    fn update_task_args_require_an_integer_id() {
        let ok: Result<UpdateTaskArgs, _> =
            serde_json::from_value(json!({"task_id": 3, "completed": true}));
        assert!(ok.is_ok());

        let bad: Result<UpdateTaskArgs, _> =
            serde_json::from_value(json!({"task_id": "three"}));
        assert!(bad.is_err());
    }

    #[test]
    fn empty_owner_is_rejected() {
        assert!(require_owner(None).is_err());
        assert!(require_owner(Some(String::new())).is_err());
        assert_eq!(require_owner(Some("u1".into())).unwrap(), "u1");
    }
}
