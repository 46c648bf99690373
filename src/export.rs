use crate::client::ClickUpClient;
use crate::error::Result;
use crate::types::{ExportRow, CSV_HEADER};
use chrono::{DateTime, Utc};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Result of a complete export run.
#[derive(Debug)]
pub struct ExportSummary {
    pub task_count: usize,
    pub row_count: usize,
    pub tasks_without_comments: usize,
    pub output_file: String,
    pub finished_at: DateTime<Utc>,
}

/// Run the export pipeline: fetch every task in the list, fetch each
/// task's comments in order, flatten to rows, and write the CSV.
///
/// A task with comments contributes one row per comment; a task without
/// contributes a single placeholder row, so every task appears at least
/// once in the output. `task_throttle` is the static pause between tasks,
/// separate from the 429 backoff inside the client.
#[instrument(skip(client))]
pub async fn run_export(
    client: &ClickUpClient,
    list_id: &str,
    output_path: &Path,
    task_throttle: Duration,
) -> Result<ExportSummary> {
    info!(list_id, "🚀 starting export pipeline");

    println!("📡 Fetching tasks from list {}...", list_id);
    let tasks = client.fetch_all_tasks(list_id).await?;
    println!("✅ Fetched {} tasks", tasks.len());

    println!("🔧 Fetching comments...");
    let mut rows: Vec<ExportRow> = Vec::new();
    let mut tasks_without_comments = 0;

    for (i, task) in tasks.iter().enumerate() {
        let comments = client.fetch_comments(&task.id).await?;
        if comments.is_empty() {
            tasks_without_comments += 1;
            rows.push(ExportRow::placeholder(task));
        } else {
            for comment in &comments {
                rows.push(ExportRow::from_comment(task, comment));
            }
        }
        debug!(task_id = %task.id, comments = comments.len(), "processed task");
        if (i + 1) % 10 == 0 {
            println!("   Processed {}/{} tasks", i + 1, tasks.len());
        }

        if i + 1 < tasks.len() {
            tokio::time::sleep(task_throttle).await;
        }
    }

    write_rows(output_path, &rows)?;
    info!(
        tasks = tasks.len(),
        rows = rows.len(),
        output = %output_path.display(),
        "export complete"
    );

    Ok(ExportSummary {
        task_count: tasks.len(),
        row_count: rows.len(),
        tasks_without_comments,
        output_file: output_path.display().to_string(),
        finished_at: Utc::now(),
    })
}

/// Write header and rows to `path`, overwriting any existing file.
fn write_rows(path: &Path, rows: &[ExportRow]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(CSV_HEADER)?;
    for row in rows {
        writer.write_record(row.as_record())?;
    }
    writer.flush()?;
    Ok(())
}
