use serde::Serialize;
use std::fmt;

/// Output format selection for all subcommands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Single JSON object on stdout.
    Json,
    /// Human-readable summary on stdout.
    #[default]
    Human,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Human => write!(f, "human"),
        }
    }
}

/// Render a successful result.
///
/// - **Json**: a single JSON object, no extraneous text.
/// - **Human**: the `Display` representation.
pub fn render<T: Serialize + fmt::Display>(
    format: OutputFormat,
    value: &T,
) -> Result<String, serde_json::Error> {
    match format {
        OutputFormat::Json => serde_json::to_string(value),
        OutputFormat::Human => Ok(value.to_string()),
    }
}

/// Write a successful result to stdout.
pub fn emit<T: Serialize + fmt::Display>(
    format: OutputFormat,
    value: &T,
) -> Result<(), serde_json::Error> {
    let text = render(format, value)?;
    println!("{}", text.trim_end());
    Ok(())
}

/// Render an error for stdout (JSON mode) or stderr (human mode).
pub fn render_error(format: OutputFormat, exit_code: u8, message: &str) -> String {
    match format {
        OutputFormat::Json => serde_json::json!({
            "error": message,
            "exit_code": exit_code,
        })
        .to_string(),
        OutputFormat::Human => format!("error: {message}"),
    }
}

/// Write an error to stdout (JSON mode) or stderr (human mode).
pub fn emit_error(format: OutputFormat, exit_code: u8, message: &str) {
    let text = render_error(format, exit_code, message);
    match format {
        // JSON errors go to stdout so the caller always gets valid JSON on stdout.
        OutputFormat::Json => println!("{text}"),
        OutputFormat::Human => eprintln!("{text}"),
    }
}
