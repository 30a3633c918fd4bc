//! Output formatting for CLI commands
//!
//! Human output goes to stdout with short status markers. JSON output prints
//! one document per command so it can be piped into other tools. Logs always
//! go to stderr and never mix with either.

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Human,
    Json,
}

impl OutputFormat {
    pub fn from_json_flag(json: bool) -> Self {
        if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }

    pub fn is_json(self) -> bool {
        self == OutputFormat::Json
    }
}

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    /// Prints the command's result document (JSON mode only)
    fn print_json(&self, value: &serde_json::Value);
}

/// Human-readable formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {message}");
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {message}");
    }
    fn warn(&self, message: &str) {
        eprintln!("\u{26a0} Warning: {message}");
    }
    fn info(&self, message: &str) {
        println!("  {message}");
    }
    fn print_json(&self, _value: &serde_json::Value) {}
}

/// JSON formatter; only errors and the result document are printed
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, _message: &str) {}
    fn error(&self, message: &str) {
        eprintln!("{}", serde_json::json!({ "success": false, "error": message }));
    }
    fn warn(&self, message: &str) {
        eprintln!("{}", serde_json::json!({ "level": "warning", "message": message }));
    }
    fn info(&self, _message: &str) {}
    fn print_json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::Json => Box::new(JsonFormatter),
        OutputFormat::Human => Box::new(HumanFormatter),
    }
}

/// Joins sheet names for human output (`objects, stats` or `-`)
pub fn sheet_list<T: std::fmt::Display>(sheets: &[T]) -> String {
    if sheets.is_empty() {
        return "-".to_string();
    }
    sheets
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
