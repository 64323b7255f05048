// src/prompt.rs
// =============================================================================
// Interactive terminal prompts, behind a capability trait.
//
// The renumbering algorithm only ever sees the `Prompter` trait, so it can
// be driven headlessly in tests (always-confirm / always-deny fakes). The
// terminal implementation hides the cursor while waiting on a keypress and
// restores it before exiting on Ctrl-C — otherwise the shell is left with
// an invisible cursor.
// =============================================================================

use anyhow::Result;
use console::{Key, Style, Term};

/// Everything the interactive flows need from a terminal.
pub trait Prompter {
    /// Yes/no confirmation for a proposed change.
    fn confirm(&mut self, message: &str) -> Result<bool>;

    /// Free-text input.
    fn input(&mut self, message: &str) -> Result<String>;

    /// Pick one of `choices`; None when the user gives an empty answer.
    fn select(&mut self, message: &str, choices: &[String]) -> Result<Option<usize>>;
}

/// Real terminal prompter.
pub struct TerminalPrompter {
    term: Term,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self {
            term: Term::stdout(),
        }
    }

    /// Ctrl-C arrives as a raw byte while the cursor is hidden; the cursor
    /// must come back before the process dies.
    fn abort(&self) -> ! {
        let _ = self.term.show_cursor();
        let _ = self.term.write_line("");
        std::process::exit(1);
    }
}

impl Prompter for TerminalPrompter {
    fn confirm(&mut self, message: &str) -> Result<bool> {
        let bold = Style::new().bold();
        self.term
            .write_line(&format!("{} [y/N]", bold.apply_to(message)))?;

        self.term.hide_cursor()?;
        let answer = loop {
            match self.term.read_key()? {
                Key::Char('y') | Key::Char('Y') => break true,
                Key::Char('n') | Key::Char('N') | Key::Enter | Key::Escape => break false,
                // Ctrl-C in raw mode.
                Key::Char('\u{3}') => self.abort(),
                _ => {}
            }
        };
        self.term.show_cursor()?;

        Ok(answer)
    }

    fn input(&mut self, message: &str) -> Result<String> {
        self.term.write_str(&format!("{} ", message))?;
        Ok(self.term.read_line()?.trim().to_string())
    }

    fn select(&mut self, message: &str, choices: &[String]) -> Result<Option<usize>> {
        self.term.write_line(message)?;
        for (i, choice) in choices.iter().enumerate() {
            self.term.write_line(&format!("  {}) {}", i + 1, choice))?;
        }

        loop {
            self.term.write_str("Choice (empty to cancel): ")?;
            let answer = self.term.read_line()?;
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(None);
            }
            match answer.parse::<usize>() {
                Ok(n) if (1..=choices.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => self.term.write_line("Please enter one of the numbers.")?,
            }
        }
    }
}

/// Scores `haystack` against `needle` as a case-insensitive subsequence
/// match. Higher is better: consecutive hits and early matches score up.
/// None when `needle` is not a subsequence at all.
pub fn fuzzy_score(needle: &str, haystack: &str) -> Option<i64> {
    if needle.is_empty() {
        return Some(0);
    }

    let needle: Vec<char> = needle.to_lowercase().chars().collect();
    let haystack: Vec<char> = haystack.to_lowercase().chars().collect();

    let mut score: i64 = 0;
    let mut ni = 0;
    let mut last_hit: Option<usize> = None;

    for (hi, &ch) in haystack.iter().enumerate() {
        if ni < needle.len() && ch == needle[ni] {
            score += match last_hit {
                Some(prev) if hi == prev + 1 => 5,
                _ => 1,
            };
            last_hit = Some(hi);
            ni += 1;
        }
    }

    if ni < needle.len() {
        return None;
    }

    // Shorter haystacks rank above longer ones with the same hits.
    Some(score - haystack.len() as i64 / 4)
}

/// The `limit` best fuzzy matches, best first.
pub fn fuzzy_top<'a>(needle: &str, candidates: &'a [String], limit: usize) -> Vec<&'a str> {
    let mut scored: Vec<(i64, &str)> = candidates
        .iter()
        .filter_map(|c| fuzzy_score(needle, c).map(|s| (s, c.as_str())))
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(b.1)));
    scored.into_iter().take(limit).map(|(_, c)| c).collect()
}
