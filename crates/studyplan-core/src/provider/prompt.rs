//! Prompt rendering for external suggestion requests.

use chrono::{DateTime, Utc};
use indoc::{formatdoc, indoc};

use crate::schedule::{Task, UserSchedulingPreferences};

/// System instruction sent with every suggestion request.
pub const SYSTEM_PROMPT: &str = indoc! {"
    You are a strict JSON scheduling assistant for a student planner.
    Reply ONLY with a single JSON object, with no markdown, no backticks and no extra text.
    All timestamps must be ISO-8601 / RFC 3339 with an explicit offset (for example 2024-01-02T09:00:00Z).
    The JSON shape must be exactly:
    {\"suggestions\":[{\"taskId\":\"<id>\",\"startAt\":\"<timestamp>\",\"endAt\":\"<timestamp>\",\"rationale\":\"<optional text>\",\"confidence\":<optional number 0-1>}]}
"};

/// Render one line per task.
fn render_task(task: &Task, default_duration_minutes: u32) -> String {
    let due = task
        .due_at
        .map(|d| d.to_rfc3339())
        .unwrap_or_else(|| "none".to_string());
    let effort = task.effort_minutes.unwrap_or(default_duration_minutes);
    let mut line = format!(
        "- id: {id} | title: {title} | due: {due} | effort: {effort} minutes | priority: {priority}",
        id = task.id,
        title = task.title,
        priority = task.priority.as_str(),
    );
    if let Some(notes) = task.notes.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        line.push_str(&format!(" | notes: {notes}"));
    }
    line
}

/// Render the user message describing the batch and the work window.
pub fn render_user_prompt(
    tasks: &[Task],
    preferences: &UserSchedulingPreferences,
    now: DateTime<Utc>,
) -> String {
    let task_lines: Vec<String> = tasks
        .iter()
        .map(|t| render_task(t, preferences.default_duration_minutes))
        .collect();
    let timezone = preferences.timezone.as_deref().unwrap_or("UTC");

    formatdoc! {"
        Current date and time (UTC): {now}
        User timezone: {timezone}
        Work window: {start:02}:00 to {end:02}:00 local time, every day.
        Propose one time block per task, inside the work window, not overlapping each other.
        Tasks:
        {tasks}
        ",
        now = now.to_rfc3339(),
        start = preferences.window.start_hour,
        end = preferences.window.end_hour,
        tasks = task_lines.join("\n"),
    }
}
