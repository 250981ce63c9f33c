//! Helpful error types for CLI commands
//!
//! Every error includes:
//! - What went wrong
//! - Context about the situation
//! - Suggestions for how to fix it

use std::fmt;
use std::path::Path;

/// An error with helpful context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    /// The main error message
    pub message: String,
    /// Additional context about what was happening
    pub context: Option<String>,
    /// Suggestions for how to fix the error
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    /// Create a new helpful error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    /// Add context to the error
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Add multiple suggestions
    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    // === Common error constructors ===

    /// The redis url could not be parsed
    pub fn invalid_redis_url(url: &str, reason: &str) -> Self {
        Self::new(format!("Invalid redis url: {}", url))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Use the form redis://[:<password>@]<host>:<port>[/<db>]".to_string(),
                "TRY: Example: keyscope index redis://localhost:6379/0".to_string(),
            ])
    }

    /// The server could not be reached
    pub fn redis_unreachable(url: &str, reason: &str) -> Self {
        Self::new(format!("Cannot connect to redis at {}", url))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Check the server is running: redis-cli -u <url> PING".to_string(),
                "TRY: Verify host, port and password in the url".to_string(),
                "TRY: Check firewalls between this host and the server".to_string(),
            ])
    }

    /// No index file at the expected location
    pub fn index_not_found(path: &Path) -> Self {
        Self::new(format!("Index file not found: {}", path.display()))
            .with_context("The display command renders an index produced by 'keyscope index'")
            .with_suggestions([
                "TRY: Build an index first: keyscope index redis://localhost:6379".to_string(),
                "TRY: Point to an existing index with --index-file".to_string(),
            ])
    }

    /// The index exists but cannot be used
    pub fn index_unreadable(path: &Path, reason: &str) -> Self {
        Self::new(format!("Cannot read index: {}", path.display()))
            .with_context(reason.to_string())
            .with_suggestions([
                "TRY: Rebuild the index with the current version: keyscope index <url>".to_string(),
                format!("TRY: Inspect the file: head -c 400 {}", path.display()),
            ])
    }

    /// Configuration file or flags are invalid
    pub fn invalid_config(reason: &str) -> Self {
        Self::new(format!("Invalid configuration: {}", reason))
            .with_context("Values come from --config (TOML) overridden by command-line flags")
            .with_suggestions([
                "TRY: --workers, --scan-count and --max-children must be at least 1".to_string(),
                "TRY: Run 'keyscope index --help' to see every option".to_string(),
            ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
