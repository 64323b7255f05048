// src/util.rs
// =============================================================================
// Small helpers shared by both tools.
// =============================================================================

use console::Style;

/// Two-digit zero-padded number, the format used in chapter and listing
/// folder names (`ch04`, `listing_04_02`).
pub fn pad2(n: u32) -> String {
    format!("{:02}", n)
}

/// Finds the first name containing `needle`, skipping staged `_tmp` names.
pub fn find_name_including<'a>(names: &'a [String], needle: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|name| name.contains(needle) && !name.contains("_tmp"))
        .map(String::as_str)
}

/// Prints a line-by-line red/green diff of two versions of a document.
pub fn print_diff(old: &str, new: &str) {
    let red = Style::new().red();
    let green = Style::new().green();

    let old_lines: Vec<&str> = old.lines().collect();
    let new_lines: Vec<&str> = new.lines().collect();

    for (i, old_line) in old_lines.iter().enumerate() {
        let new_line = new_lines.get(i).copied().unwrap_or("");
        if *old_line != new_line {
            println!("{}", red.apply_to(format!("- {}", old_line)));
            println!("{}", green.apply_to(format!("+ {}", new_line)));
        }
    }
}
