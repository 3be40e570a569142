use crate::pipeline::RunSummary;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
pub struct TableRow {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

#[derive(Tabled)]
struct ErrorRow {
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

/// Counters of a finished run
pub fn summary_table(summary: &RunSummary) -> String {
    let rows = [
        ("Discovered", summary.discovered),
        ("Processed", summary.processed),
        ("Skipped (cached)", summary.skipped),
        ("Unsupported", summary.unsupported),
        ("Errored", summary.errored),
        ("Chunks written", summary.chunks_written),
    ]
    .into_iter()
    .map(|(metric, value)| TableRow {
        metric: metric.to_string(),
        value: value.to_string(),
    });

    Table::new(rows).with(Style::rounded()).to_string()
}

/// One row per failed file; empty when there were no failures
pub fn errors_table(errors: &[(String, String)]) -> String {
    if errors.is_empty() {
        return String::new();
    }

    let rows = errors.iter().map(|(file, reason)| ErrorRow {
        file: file.clone(),
        reason: reason.clone(),
    });
    Table::new(rows).with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_table_lists_counters() {
        let summary = RunSummary {
            discovered: 3,
            processed: 2,
            errored: 1,
            chunks_written: 4,
            ..Default::default()
        };
        let table = summary_table(&summary);
        assert!(table.contains("Skipped (cached)"));
        assert!(table.contains("Chunks written"));
        assert!(table.contains('4'));
    }

    #[test]
    fn test_errors_table() {
        assert!(errors_table(&[]).is_empty());
        let table = errors_table(&[("B.java".to_string(), "Parse error: bad".to_string())]);
        assert!(table.contains("B.java"));
        assert!(table.contains("Parse error: bad"));
    }
}
