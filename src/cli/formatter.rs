/// Terminal output helpers shared by the commands
///
/// Everything here writes to stderr so that stdout stays reserved for the
/// reconstructed feature stream.
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!(
        "{} {}",
        "⚠".yellow(),
        format!("Warning: {}", message).yellow()
    );
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

/// Print a tip
pub fn print_tip(message: &str) {
    eprintln!("{} {}", "→".cyan(), format!("Tip: {}", message).dimmed());
}

/// Create a spinner style for indeterminate operations
pub fn create_spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner:.cyan} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
}

/// Spinner on stderr, hidden when `quiet`.
pub fn create_spinner(message: &str, quiet: bool) -> ProgressBar {
    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    pb.set_style(create_spinner_style());
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Build a two-column statistics table
pub fn stats_table(title: &str, stats: &[(&str, String)]) -> comfy_table::Table {
    use comfy_table::modifiers::UTF8_ROUND_CORNERS;
    use comfy_table::presets::UTF8_FULL;
    use comfy_table::{Attribute, Cell, Color as TableColor, ContentArrangement, Table};

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new(title)
            .add_attribute(Attribute::Bold)
            .fg(TableColor::Cyan),
        Cell::new("").add_attribute(Attribute::Bold),
    ]);

    for (label, value) in stats {
        table.add_row(vec![
            Cell::new(label),
            Cell::new(value).fg(TableColor::Green),
        ]);
    }

    table
}

/// Print a statistics table using comfy_table
pub fn print_stats_table(title: &str, stats: &[(&str, String)]) {
    eprintln!("\n{}", stats_table(title, stats));
}

/// Check if colors should be disabled
pub fn colors_enabled() -> bool {
    std::env::var("NO_COLOR").is_err()
        && std::env::var("CLICOLOR").unwrap_or_else(|_| "1".to_string()) != "0"
}
