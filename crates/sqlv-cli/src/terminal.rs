//! Surface that talks to a terminal.

use sqlv_core::Row;
use sqlv_view::{Region, Surface};
use std::io::{self, BufRead, Write};

pub struct TerminalSurface {
    assume_yes: bool,
    show_fragments: bool,
}

impl TerminalSurface {
    pub fn new(assume_yes: bool, show_fragments: bool) -> Self {
        Self {
            assume_yes,
            show_fragments,
        }
    }
}

impl Surface for TerminalSurface {
    fn render(&self, region: Region, content: String) {
        if self.show_fragments {
            println!("--- #{} ---", region.element_id());
            println!("{}", content);
        }
    }

    fn alert(&self, message: &str) {
        eprintln!("{}", message);
    }

    fn confirm(&self, message: &str) -> bool {
        if self.assume_yes {
            return true;
        }

        eprint!("{} [y/N] ", message);
        let _ = io::stderr().flush();

        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        is_yes(&answer)
    }

    fn navigate(&self, url: &str) {
        println!("{}", url);
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Tab-separated rows under a header line.
pub fn format_rows(headers: &[String], rows: &[Row]) -> String {
    let mut out = headers.join("\t");
    out.push('\n');
    for row in rows {
        let cells: Vec<String> = headers.iter().map(|h| row.value(h).to_string()).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlv_core::CellValue;

    #[test]
    fn test_yes_answers() {
        assert!(is_yes("y\n"));
        assert!(is_yes(" YES "));
        assert!(!is_yes("\n"));
        assert!(!is_yes("nope"));
    }

    #[test]
    fn test_format_rows() {
        let headers = vec!["id".to_string(), "name".to_string()];
        let rows = vec![
            Row::new().with("id", 1).with("name", "Ann"),
            Row::new().with("id", 2).with("name", CellValue::Null),
        ];
        assert_eq!(format_rows(&headers, &rows), "id\tname\n1\tAnn\n2\tNULL\n");
    }

    #[test]
    fn test_assume_yes_skips_prompt() {
        assert!(TerminalSurface::new(true, false).confirm("Drop?"));
    }
}
