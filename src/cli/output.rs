//! Colored output helpers for CLI
//!
//! Provides consistent, colored terminal output for the docchat CLI.

use crate::types::ScoredChunk;
use owo_colors::OwoColorize;
use std::io::{self, Write};

/// Output style configuration
pub struct Output {
    /// Whether to use colored output
    pub colored: bool,
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}

impl Output {
    /// Create a new output helper with colors enabled
    pub fn new() -> Self {
        Self { colored: true }
    }

    /// Create a new output helper with colors disabled
    pub fn no_color() -> Self {
        Self { colored: false }
    }

    /// Print the chat banner
    pub fn banner(&self) {
        if self.colored {
            println!(
                "\n   {} {}",
                "docchat".bright_cyan().bold(),
                format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
            );
            println!("   {}\n", "Ask anything about the indexed docs.".bright_white());
        } else {
            println!(
                "\n   docchat v{}\n   Ask anything about the indexed docs.\n",
                env!("CARGO_PKG_VERSION")
            );
        }
    }

    /// Print a success message with a checkmark
    pub fn success(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "✓".green().bold(), message.green());
        } else {
            println!("  [OK] {}", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "•".blue(), message);
        } else {
            println!("  [INFO] {}", message);
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if self.colored {
            println!("  {} {}", "⚠".yellow().bold(), message.yellow());
        } else {
            println!("  [WARN] {}", message);
        }
    }

    /// Print an error message
    pub fn error(&self, message: &str) {
        if self.colored {
            eprintln!("  {} {}", "✗".red().bold(), message.red());
        } else {
            eprintln!("  [ERROR] {}", message);
        }
    }

    /// Print a header for a section
    pub fn header(&self, title: &str) {
        if self.colored {
            println!("\n  {}", title.bright_white().bold().underline());
        } else {
            println!("\n  === {} ===", title);
        }
    }

    /// Print a key-value pair
    pub fn kv(&self, key: &str, value: &str) {
        if self.colored {
            println!("    {}: {}", key.dimmed(), value.bright_white());
        } else {
            println!("    {}: {}", key, value);
        }
    }

    /// Print a hint/tip message
    pub fn hint(&self, message: &str) {
        if self.colored {
            println!("\n  {} {}", "💡".dimmed(), message.dimmed().italic());
        } else {
            println!("\n  [TIP] {}", message);
        }
    }

    /// Print an assistant turn
    pub fn answer(&self, text: &str) {
        if self.colored {
            println!("\n  {} {}\n", "bot:".bright_cyan().bold(), text);
        } else {
            println!("\n  bot: {}\n", text);
        }
    }

    /// Print one retrieved chunk with its score
    pub fn source(&self, rank: usize, chunk: &ScoredChunk) {
        let preview = preview(&chunk.text, 120);
        if self.colored {
            println!(
                "    {} {} {}",
                format!("[{}]", rank).dimmed(),
                format!("{:.3}", chunk.score).yellow(),
                preview
            );
        } else {
            println!("    [{}] {:.3} {}", rank, chunk.score, preview);
        }
    }

    /// Show the user prompt and read one line. Returns `None` on end of input.
    pub fn prompt(&self) -> io::Result<Option<String>> {
        if self.colored {
            print!("  {} ", "you:".bright_green().bold());
        } else {
            print!("  you: ");
        }
        io::stdout().flush()?;

        let mut input = String::new();
        if io::stdin().read_line(&mut input)? == 0 {
            return Ok(None);
        }
        Ok(Some(input.trim().to_string()))
    }

    /// Print newline
    pub fn newline(&self) {
        println!();
    }
}

/// First `max_chars` characters of `text` on one line.
fn preview(text: &str, max_chars: usize) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}
