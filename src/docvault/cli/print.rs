use chrono::{DateTime, Utc};
use colored::Colorize;
use docvault::model::{FileItem, UserPreference};
use docvault::store::InitReport;
use timeago::Formatter;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const LINE_WIDTH: usize = 80;
const SIZE_WIDTH: usize = 10;
const TIME_WIDTH: usize = 16;
const INDENT: &str = "  ";

pub(super) fn print_success(message: &str) {
    println!("{}", message.green());
}

pub(super) fn print_init(report: &InitReport) {
    match &report.error {
        Some(error) => eprintln!(
            "{} {}",
            "Warning: storage not initialized:".yellow(),
            error
        ),
        None if report.created_preferences => print_success(&format!(
            "Initialized storage at {}",
            report.root.display()
        )),
        None => println!("{}", format!("Storage ready at {}", report.root.display()).dimmed()),
    }
}

pub(super) fn print_preference(pref: &UserPreference) {
    println!("last_edit_path = {}", pref.last_edit_path);
    println!("theme = {}", pref.theme);
}

pub(super) fn print_tree(items: &[FileItem]) {
    if items.is_empty() {
        println!("No documents found.");
        return;
    }
    print_level(items, 0);
}

fn print_level(items: &[FileItem], depth: usize) {
    for item in items {
        let label = if item.is_dir() {
            format!("{}{}/", INDENT.repeat(depth), item.name)
        } else {
            format!("{}{}", INDENT.repeat(depth), item.name)
        };

        let available = LINE_WIDTH.saturating_sub(SIZE_WIDTH + TIME_WIDTH);
        let label = truncate_to_width(&label, available);
        let padding = available.saturating_sub(label.width());

        let size = if item.is_dir() {
            String::new()
        } else {
            format_size(item.size)
        };
        let time = item.modified_at.map(format_time_ago).unwrap_or_default();

        let label_colored = if item.is_dir() {
            label.blue().bold()
        } else {
            label.normal()
        };

        println!(
            "{}{}{:>size_width$}{}",
            label_colored,
            " ".repeat(padding),
            size,
            time.dimmed(),
            size_width = SIZE_WIDTH
        );

        if item.is_dir() {
            print_level(item.children(), depth + 1);
        }
    }
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    match bytes {
        b if b < KB => format!("{} B", b),
        b if b < MB => format!("{:.1} KB", b as f64 / KB as f64),
        b => format!("{:.1} MB", b as f64 / MB as f64),
    }
}

fn truncate_to_width(s: &str, max_width: usize) -> String {
    let mut result = String::new();
    let mut current_width = 0;

    for c in s.chars() {
        let char_width = c.width().unwrap_or(0);
        if current_width + char_width > max_width.saturating_sub(1) {
            result.push('…');
            return result;
        }
        result.push(c);
        current_width += char_width;
    }

    result
}

fn format_time_ago(timestamp: DateTime<Utc>) -> String {
    let duration = Utc::now().signed_duration_since(timestamp);
    let time_str = Formatter::new().convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_are_human_readable() {
        assert_eq!(format_size(12), "12 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn truncation_respects_display_width() {
        assert_eq!(truncate_to_width("short", 20), "short");
        let cut = truncate_to_width("a-very-long-document-name.md", 10);
        assert!(cut.ends_with('…'));
        assert!(cut.width() <= 10);
    }
}
