//! Helpers for presenting captured command output.

use super::subprocess::SubprocessResult;

/// Join stdout and stderr the way a terminal would show them.
pub fn combined_output(result: &SubprocessResult) -> String {
    match (result.stdout.is_empty(), result.stderr.is_empty()) {
        (_, true) => result.stdout.clone(),
        (true, false) => result.stderr.clone(),
        (false, false) => {
            let mut out = result.stdout.clone();
            if !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&result.stderr);
            out
        }
    }
}

/// Sanitize command output for inclusion in log lines.
///
/// Truncates long lines and limits the number of lines shown.
pub fn sanitize_output(output: &str, max_lines: usize) -> String {
    const MAX_LINE_LENGTH: usize = 200;
    const MAX_TOTAL_LENGTH: usize = 1000;

    let mut result = String::new();

    for line in output.lines().take(max_lines) {
        let truncated = match line.char_indices().nth(MAX_LINE_LENGTH) {
            Some((idx, _)) => format!("{}...", &line[..idx]),
            None => line.to_string(),
        };

        if result.len() + truncated.len() > MAX_TOTAL_LENGTH {
            result.push_str("...[truncated]");
            break;
        }

        if !result.is_empty() {
            result.push('\n');
        }
        result.push_str(&truncated);
    }

    if output.lines().count() > max_lines {
        result.push_str("\n...[additional output truncated]");
    }

    result
}
