//! Output helper functions for consistent styled messages.

use super::colors::SemanticStyle;

/// Prints a bold section title followed by an underline.
pub fn print_section(title: &str) {
    println!("{}", title.header());
    println!("{}", "=".repeat(title.len()).muted());
}

/// Prints a labeled key-value pair with proper indentation.
pub fn print_labeled(key: &str, value: &str) {
    println!("  {}: {}", key.muted(), value);
}

/// Prints a hint/suggestion with an arrow.
pub fn print_hint(msg: &str) {
    println!("{} {}", "→".muted(), msg.muted());
}

/// Prints an empty line for spacing.
pub fn print_spacer() {
    println!();
}
