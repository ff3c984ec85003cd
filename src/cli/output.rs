use serde::Serialize;

use crate::ops::reverse_sync::ReverseSyncReport;
use crate::ops::sync::SyncReport;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct SyncReportJson {
    pub board: String,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub tasks_added: usize,
    pub tasks_moved: usize,
    pub tasks_replaced: usize,
    pub tasks_archived: usize,
}

impl SyncReportJson {
    pub fn new(board: &str, report: &SyncReport) -> Self {
        SyncReportJson {
            board: board.to_string(),
            files_scanned: report.files_scanned,
            files_skipped: report.files_skipped,
            tasks_added: report.tasks_added,
            tasks_moved: report.tasks_moved,
            tasks_replaced: report.tasks_replaced,
            tasks_archived: report.tasks_archived,
        }
    }
}

#[derive(Serialize)]
pub struct ReverseReportJson {
    pub files_modified: usize,
    pub lines_flipped: usize,
}

impl From<&ReverseSyncReport> for ReverseReportJson {
    fn from(report: &ReverseSyncReport) -> Self {
        ReverseReportJson {
            files_modified: report.files_modified,
            lines_flipped: report.lines_flipped,
        }
    }
}

#[derive(Serialize)]
pub struct ListJson {
    pub name: String,
    pub tasks: usize,
}

#[derive(Serialize)]
pub struct StatusJson {
    pub board: String,
    pub lists: Vec<ListJson>,
    pub archived: usize,
    pub tasks_with_origins: usize,
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

pub fn format_sync_report(board: &str, report: &SyncReport) -> String {
    let mut out = format!(
        "synced {} file{} into {}\n  added {}, moved {}, updated {}, archived {}",
        report.files_scanned,
        plural(report.files_scanned),
        board,
        report.tasks_added,
        report.tasks_moved,
        report.tasks_replaced,
        report.tasks_archived,
    );
    if report.files_skipped > 0 {
        out.push_str(&format!(
            "\n  skipped {} unreadable file{}",
            report.files_skipped,
            plural(report.files_skipped)
        ));
    }
    out
}

pub fn format_reverse_report(report: &ReverseSyncReport) -> String {
    if report.lines_flipped == 0 {
        return "no completion changes".to_string();
    }
    format!(
        "updated {} task{} in {} file{}",
        report.lines_flipped,
        plural(report.lines_flipped),
        report.files_modified,
        plural(report.files_modified),
    )
}

pub fn format_status(status: &StatusJson) -> String {
    let width = status.lists.iter().map(|l| l.name.len()).max().unwrap_or(0);
    let mut lines = vec![status.board.clone()];
    for list in &status.lists {
        lines.push(format!("  {:<width$}  {}", list.name, list.tasks, width = width));
    }
    lines.push(format!("  {:<width$}  {}", "archived", status.archived, width = width));
    lines.join("\n")
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
