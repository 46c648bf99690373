use serde::Deserialize;

/// Column order of the export file. One row per comment, or a single
/// placeholder row for a task with no comments.
pub const CSV_HEADER: [&str; 8] = [
    "Task ID",
    "Task Name",
    "Assignees",
    "Task Status",
    "Priority",
    "Comment Text",
    "Comment Author",
    "Comment Date",
];

/// A task as returned by the ClickUp v2 list-tasks endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub assignees: Vec<Assignee>,
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Option<Priority>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Assignee {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskStatus {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Priority {
    pub priority: String,
}

/// A comment as returned by the task-comments endpoint. The `date` string
/// is preserved verbatim in the export.
#[derive(Debug, Clone, Deserialize)]
pub struct Comment {
    #[serde(default)]
    pub comment_text: String,
    #[serde(default)]
    pub user: Option<CommentAuthor>,
    pub date: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommentAuthor {
    pub username: String,
}

/// Response envelope of `GET /list/{list_id}/task`.
#[derive(Debug, Deserialize)]
pub struct TasksPage {
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// Response envelope of `GET /task/{task_id}/comment`.
#[derive(Debug, Deserialize)]
pub struct CommentsPage {
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Task {
    /// Assignee usernames joined with `", "`.
    pub fn assignee_names(&self) -> String {
        self.assignees
            .iter()
            .map(|a| a.username.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Priority label, defaulting to `"None"` when the task has none.
    pub fn priority_label(&self) -> &str {
        self.priority
            .as_ref()
            .map(|p| p.priority.as_str())
            .unwrap_or("None")
    }
}

impl Comment {
    /// Author username, defaulting to `"Unknown"` when the API omits the user.
    pub fn author(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.username.as_str())
            .unwrap_or("Unknown")
    }

    /// Comment body with embedded line breaks flattened to spaces and
    /// surrounding whitespace trimmed.
    pub fn normalized_text(&self) -> String {
        self.comment_text
            .replace(['\n', '\r'], " ")
            .trim()
            .to_string()
    }
}

/// Flattened (task, comment) record ready for CSV output.
#[derive(Debug, Clone)]
pub struct ExportRow {
    pub task_id: String,
    pub task_name: String,
    pub assignees: String,
    pub status: String,
    pub priority: String,
    pub comment_text: String,
    pub comment_author: String,
    pub comment_date: String,
}

impl ExportRow {
    pub fn from_comment(task: &Task, comment: &Comment) -> Self {
        Self {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            assignees: task.assignee_names(),
            status: task.status.status.clone(),
            priority: task.priority_label().to_string(),
            comment_text: comment.normalized_text(),
            comment_author: comment.author().to_string(),
            comment_date: comment.date.clone(),
        }
    }

    /// Row emitted for a task with no comments: task fields populated,
    /// comment fields empty.
    pub fn placeholder(task: &Task) -> Self {
        Self {
            task_id: task.id.clone(),
            task_name: task.name.clone(),
            assignees: task.assignee_names(),
            status: task.status.status.clone(),
            priority: task.priority_label().to_string(),
            comment_text: String::new(),
            comment_author: String::new(),
            comment_date: String::new(),
        }
    }

    pub fn as_record(&self) -> [&str; 8] {
        [
            &self.task_id,
            &self.task_name,
            &self.assignees,
            &self.status,
            &self.priority,
            &self.comment_text,
            &self.comment_author,
            &self.comment_date,
        ]
    }
}
