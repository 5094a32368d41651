//! Output formatter for human-readable and JSON output
//!
//! Ensures consistent output formatting across all actions.

use serde::Serialize;

use super::OutputConfig;

/// Width of the `#` banner printed before each phase
const BANNER_WIDTH: usize = 90;

/// Formatter for CLI output
///
/// Handles both human-readable and JSON output formats based on configuration.
/// When JSON mode is enabled, all output is strict JSON without colors or banners.
#[derive(Debug, Clone)]
pub struct Formatter {
    config: OutputConfig,
}

impl Formatter {
    /// Create a new formatter with the given configuration
    pub fn new(config: OutputConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> OutputConfig {
        self.config
    }

    /// Check if JSON output mode is enabled
    pub fn is_json(&self) -> bool {
        self.config.json
    }

    /// Check if colors are enabled
    pub fn colors_enabled(&self) -> bool {
        !self.config.no_color && !self.config.json
    }

    /// Print a centred `#` banner announcing a phase
    pub fn banner(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        println!();
        println!("{}", banner_lines(message));
    }

    /// Print a progress note for human readers only
    pub fn status(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }
        println!("{message}");
    }

    /// Output an error message
    ///
    /// Errors are always printed, even in quiet mode.
    pub fn error(&self, message: &str) {
        if self.config.json {
            let error = serde_json::json!({
                "error": message
            });
            eprintln!(
                "{}",
                serde_json::to_string_pretty(&error).unwrap_or_else(|_| message.to_string())
            );
        } else if self.colors_enabled() {
            eprintln!("\x1b[31m✗\x1b[0m {message}");
        } else {
            eprintln!("✗ {message}");
        }
    }

    /// Output a warning message
    pub fn warning(&self, message: &str) {
        if self.config.quiet || self.config.json {
            return;
        }

        if self.colors_enabled() {
            eprintln!("\x1b[33m⚠\x1b[0m {message}");
        } else {
            eprintln!("⚠ {message}");
        }
    }

    /// Output JSON directly
    pub fn json<T: Serialize>(&self, value: &T) {
        match serde_json::to_string_pretty(value) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing output: {e}"),
        }
    }

    /// Print a line of text (respects quiet mode)
    pub fn println(&self, message: &str) {
        if self.config.quiet {
            return;
        }
        println!("{message}");
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

/// Render a banner without the leading blank line
pub fn banner_lines(message: &str) -> String {
    let rule = "#".repeat(BANNER_WIDTH);
    let inner = BANNER_WIDTH - 2;
    format!("{rule}\n#{message:^inner$}#\n{rule}")
}

/// Format a byte count with thousands separators (`1234567` → `1,234,567`)
pub fn format_size(bytes: u64) -> String {
    let digits = bytes.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// One line of the bucket listing
pub fn list_line(size: u64, key: &str) -> String {
    format!("{:>14} - {key}", format_size(size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formatter_default() {
        let formatter = Formatter::default();
        assert!(!formatter.is_json());
        assert!(formatter.colors_enabled());
    }

    #[test]
    fn test_formatter_json_mode() {
        let config = OutputConfig {
            json: true,
            ..Default::default()
        };
        let formatter = Formatter::new(config);
        assert!(formatter.is_json());
        assert!(!formatter.colors_enabled());
    }

    #[test]
    fn test_formatter_no_color() {
        let config = OutputConfig {
            no_color: true,
            ..Default::default()
        };
        let formatter = Formatter::new(config);
        assert!(!formatter.colors_enabled());
    }

    #[test]
    fn test_banner() {
        insta::assert_snapshot!(banner_lines("Connecting to Object Storage"), @r"
        ##########################################################################################
        #                              Connecting to Object Storage                              #
        ##########################################################################################
        ");
    }

    #[test]
    fn test_banner_odd_padding() {
        insta::assert_snapshot!(banner_lines("Listing Objects in backups Bucket"), @r"
        ##########################################################################################
        #                           Listing Objects in backups Bucket                            #
        ##########################################################################################
        ");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0");
        assert_eq!(format_size(999), "999");
        assert_eq!(format_size(1000), "1,000");
        assert_eq!(format_size(1_234_567), "1,234,567");
        assert_eq!(format_size(u64::MAX), "18,446,744,073,709,551,615");
    }

    #[test]
    fn test_list_line() {
        assert_eq!(list_line(1_234_567, "/etc/hosts"), "     1,234,567 - /etc/hosts");
        assert_eq!(list_line(7, "a"), "             7 - a");
    }
}
