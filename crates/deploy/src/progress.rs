//! Operator-facing progress banners.

use std::io::IsTerminal;

use crossterm::{style::Stylize, terminal};

const FALLBACK_WIDTH: u16 = 80;

/// Banner printed before a phase starts.
pub fn started(description: &str) -> String {
    let width = terminal::size().map(|(w, _)| w).unwrap_or(FALLBACK_WIDTH);
    format!("⌛ {description} \n{}", "-".repeat(width as usize))
}

/// Banner printed after a phase completes.
pub fn completed(description: &str) -> String {
    format!("🙌 {description} Complete ")
}

/// Line printed when a finished step is skipped.
pub fn skipped(name: &str) -> String {
    format!("Skipping {name} since it has already been completed")
}

/// Print a banner to stdout, highlighted when stdout is a terminal.
pub fn print_banner(banner: &str) {
    if std::io::stdout().is_terminal() {
        println!("{}", banner.bold().white().on_green());
    } else {
        println!("{banner}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banners() {
        assert!(started("Compile Contract").starts_with("⌛ Compile Contract \n-"));
        assert_eq!(completed("Compile Contract"), "🙌 Compile Contract Complete ");
        assert_eq!(
            skipped("compileContract"),
            "Skipping compileContract since it has already been completed"
        );
    }
}
