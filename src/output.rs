use atty::Stream;
use colored::*;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};

/// Formatted terminal output for gh-audit
pub struct Output;

impl Output {
    /// Check if colors should be enabled
    pub(crate) fn colors_enabled() -> bool {
        atty::is(Stream::Stdout) && std::env::var("NO_COLOR").is_err()
    }

    /// Disable colors if terminal doesn't support them
    fn disable_colors_if_needed() {
        if !Self::colors_enabled() {
            colored::control::set_override(false);
        }
    }

    /// Initialize output system (call at startup)
    pub fn init() {
        Self::disable_colors_if_needed();
    }

    /// Show a success message
    pub fn success(msg: &str) {
        if Self::colors_enabled() {
            println!("{} {}", "✓".green().bold(), msg.green());
        } else {
            println!("✓ {}", msg);
        }
    }

    /// Show an error message
    pub fn error(msg: &str) {
        if Self::colors_enabled() {
            eprintln!("{} {}", "✗".red().bold(), msg.red());
        } else {
            eprintln!("✗ {}", msg);
        }
    }

    /// Show a warning message
    pub fn warning(msg: &str) {
        if Self::colors_enabled() {
            println!("{} {}", "⚠".yellow().bold(), msg.yellow());
        } else {
            println!("⚠ {}", msg);
        }
    }

    /// Show an info message
    pub fn info(msg: &str) {
        if Self::colors_enabled() {
            println!("{} {}", "ℹ".cyan().bold(), msg.cyan());
        } else {
            println!("ℹ {}", msg);
        }
    }

    /// Show a heading
    pub fn heading(msg: &str) {
        if Self::colors_enabled() {
            println!("\n{}", msg.bold().bright_blue());
        } else {
            println!("\n{}", msg);
        }
    }

    /// Show a list item
    pub fn list_item(item: &str) {
        if Self::colors_enabled() {
            println!("  {} {}", "•".cyan(), item);
        } else {
            println!("  • {}", item);
        }
    }

    /// Create a table for displaying data
    pub fn table() -> Table {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        // Make table responsive to terminal width
        if let Some((_width, _)) = term_size::dimensions() {
            table.set_content_arrangement(ContentArrangement::Dynamic);
        }
        table
    }

    /// Show per-repository audit results in a table
    pub fn repo_table(rows: &[(&str, String, String)]) {
        let mut table = Self::table();
        table.set_header(vec!["Repository", "Failed Checks", "CODEOWNERS"]);

        for (name, failed, codeowners) in rows {
            let name_cell = if Self::colors_enabled() {
                Cell::new(name).fg(comfy_table::Color::Cyan)
            } else {
                Cell::new(name)
            };
            table.add_row(vec![name_cell, Cell::new(failed), Cell::new(codeowners)]);
        }

        println!("{}", table);
    }

    /// Create a progress bar
    pub fn progress_bar(len: u64) -> ProgressBar {
        let pb = ProgressBar::new(len);

        // Use different styles based on terminal capabilities
        let template = if Self::colors_enabled() {
            "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({percent}%) {msg}"
        } else {
            "[{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"
        };

        pb.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .unwrap()
                .progress_chars(if Self::colors_enabled() { "#>-" } else { "=>-" }),
        );
        pb
    }
}
