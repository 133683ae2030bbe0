use super::DiffOptions;
use anyhow::Result;
use colored::Colorize;
use similar::{ChangeTag, TextDiff};
use std::io::Write;
use tracing::{Level, debug, span};

/// Write a unified diff of `old` against `new`.
///
/// The `---`/`+++` header lines carry the given labels verbatim. Deleted lines
/// are red, inserted lines green and hunk headers cyan when colour is on. A
/// final line without a newline is terminated in the output so the next
/// record starts on its own line.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_unified_diff(
    old: &str,
    new: &str,
    old_label: &str,
    new_label: &str,
    options: &DiffOptions,
    writer: &mut dyn Write,
) -> Result<()> {
    let span = span!(Level::DEBUG, "render_diff", old = old_label, new = new_label);
    let _guard = span.enter();

    let diff = TextDiff::configure()
        .algorithm(options.algorithm)
        .diff_lines(old, new);

    let paint = |text: String, tag: Option<ChangeTag>| -> String {
        if !options.colorize {
            return text;
        }
        match tag {
            Some(ChangeTag::Delete) => text.red().to_string(),
            Some(ChangeTag::Insert) => text.green().to_string(),
            Some(ChangeTag::Equal) => text,
            None => text.cyan().to_string(),
        }
    };

    writeln!(writer, "{}", paint(format!("--- {old_label}"), Some(ChangeTag::Delete)))?;
    writeln!(writer, "{}", paint(format!("+++ {new_label}"), Some(ChangeTag::Insert)))?;

    let mut changed = 0usize;
    for hunk in diff
        .unified_diff()
        .context_radius(options.context_lines)
        .iter_hunks()
    {
        writeln!(writer, "{}", paint(hunk.header().to_string(), None))?;
        for change in hunk.iter_changes() {
            let sign = match change.tag() {
                ChangeTag::Delete => '-',
                ChangeTag::Insert => '+',
                ChangeTag::Equal => ' ',
            };
            if change.tag() != ChangeTag::Equal {
                changed += 1;
            }
            let line = change.to_string_lossy();
            let line = line.strip_suffix('\n').unwrap_or(&line);
            writeln!(writer, "{}", paint(format!("{sign}{line}"), Some(change.tag())))?;
        }
    }

    debug!(changed, "Diff rendered");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use similar::Algorithm;

    fn plain(context_lines: usize) -> DiffOptions {
        DiffOptions {
            context_lines,
            algorithm: Algorithm::Myers,
            colorize: false,
        }
    }

    fn render(old: &str, new: &str, options: &DiffOptions) -> String {
        let mut out = Vec::new();
        write_unified_diff(old, new, "a:x.txt", "b:x.txt", options, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_single_line_change() {
        let text = render("line1\nline2\nline3\n", "line1\nmodified\nline3\n", &plain(3));
        assert_eq!(
            text,
            "--- a:x.txt\n+++ b:x.txt\n@@ -1,3 +1,3 @@\n line1\n-line2\n+modified\n line3\n"
        );
    }

    #[test]
    fn test_identical_content_has_no_hunks() {
        let text = render("same\n", "same\n", &plain(3));
        assert_eq!(text, "--- a:x.txt\n+++ b:x.txt\n");
    }

    #[test]
    fn test_context_radius() {
        let old = "1\n2\n3\n4\n5\n6\n7\n";
        let new = "1\n2\n3\nfour\n5\n6\n7\n";
        let text = render(old, new, &plain(1));
        assert!(text.contains("@@ -3,3 +3,3 @@\n 3\n-4\n+four\n 5\n"));
        assert!(!text.contains(" 2\n"));
    }

    #[test]
    fn test_missing_trailing_newline_is_terminated() {
        let text = render("a\nb", "a\nc", &plain(3));
        assert!(text.ends_with("+c\n"));
    }
}
