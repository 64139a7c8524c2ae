//! Terminal output for task snapshots.

use anyhow::Result;
use tunesmith_core::{GenerationTask, TaskStatus};

/// One human-readable line per snapshot.
pub fn status_line(task: &GenerationTask) -> String {
    match task.status {
        TaskStatus::Idle => "idle".to_string(),
        TaskStatus::Submitting => "submitting request...".to_string(),
        TaskStatus::Generating => {
            let mut line = format!("generating {:>3}% {}", task.progress, bar(task.progress));
            if task.consecutive_failures > 0 {
                line.push_str(&format!(
                    " (status check failed {}x: {})",
                    task.consecutive_failures,
                    task.last_poll_error.as_deref().unwrap_or("unknown error")
                ));
            }
            line
        }
        TaskStatus::Complete => match &task.result {
            Some(artifact) => {
                let title = artifact.title.as_deref().unwrap_or("untitled");
                format!(
                    "complete: \"{title}\" ({}) {}",
                    duration(artifact.duration_secs),
                    artifact.audio_url
                )
            }
            None => "complete".to_string(),
        },
        TaskStatus::Error => format!(
            "error: {}",
            task.error.as_deref().unwrap_or("unknown error")
        ),
    }
}

pub fn json_line(task: &GenerationTask) -> Result<String> {
    Ok(serde_json::to_string(task)?)
}

fn bar(progress: u8) -> String {
    const WIDTH: usize = 20;
    let filled = usize::from(progress.min(100)) * WIDTH / 100;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(WIDTH - filled))
}

fn duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tunesmith_core::Artifact;

    fn task(status: TaskStatus) -> GenerationTask {
        GenerationTask {
            status,
            ..GenerationTask::idle()
        }
    }

    #[test]
    fn generating_shows_bar() {
        let mut t = task(TaskStatus::Generating);
        t.progress = 45;
        assert_eq!(status_line(&t), "generating  45% [#########-----------]");
    }

    #[test]
    fn generating_mentions_poll_failures() {
        let mut t = task(TaskStatus::Generating);
        t.consecutive_failures = 2;
        t.last_poll_error = Some("transport error: reset".into());
        assert!(status_line(&t).ends_with("(status check failed 2x: transport error: reset)"));
    }

    #[test]
    fn complete_shows_artifact() {
        let mut t = task(TaskStatus::Complete);
        t.result = Some(Artifact::new("https://cdn.example.com/a.mp3", 185.4).with_title("Sunburn"));
        assert_eq!(
            status_line(&t),
            "complete: \"Sunburn\" (3:05) https://cdn.example.com/a.mp3"
        );
    }

    #[rstest]
    #[case::message(Some("quota exceeded"), "error: quota exceeded")]
    #[case::missing(None, "error: unknown error")]
    fn error_line(#[case] message: Option<&str>, #[case] expected: &str) {
        let mut t = task(TaskStatus::Error);
        t.error = message.map(str::to_string);
        assert_eq!(status_line(&t), expected);
    }

    #[test]
    fn json_line_uses_lowercase_status() {
        let line = json_line(&task(TaskStatus::Generating)).unwrap();
        assert!(line.contains("\"status\":\"generating\""));
    }
}
