//! The logging capability the runner reports progress through.

use std::fmt::{self, Display};

/// Receives runner progress messages. Purely observational.
pub trait SeedLogger: Send + Sync {
    fn info(&self, message: &str, details: &[&dyn Display]);
    fn warn(&self, message: &str, details: &[&dyn Display]);
    fn error(&self, message: &str, details: &[&dyn Display]);
}

/// Default logger: forwards every message to `tracing` under the `seed` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl SeedLogger for TracingLogger {
    fn info(&self, message: &str, details: &[&dyn Display]) {
        tracing::info!(target: "seed", "{message}{}", Details(details));
    }

    fn warn(&self, message: &str, details: &[&dyn Display]) {
        tracing::warn!(target: "seed", "{message}{}", Details(details));
    }

    fn error(&self, message: &str, details: &[&dyn Display]) {
        tracing::error!(target: "seed", "{message}{}", Details(details));
    }
}

/// Renders auxiliary values as ` a b c` after the message.
struct Details<'a>(&'a [&'a dyn Display]);

impl Display for Details<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for detail in self.0 {
            write!(f, " {detail}")?;
        }
        Ok(())
    }
}

/// Joins a message and its details the way [`TracingLogger`] prints them.
pub fn render(message: &str, details: &[&dyn Display]) -> String {
    format!("{message}{}", Details(details))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_appends_details() {
        let err = std::io::Error::other("connection refused");
        assert_eq!(
            render("Failed to record seed run:", &[&err]),
            "Failed to record seed run: connection refused"
        );
        assert_eq!(render("plain", &[]), "plain");
    }
}
