//! # Vendor Print Integration
//!
//! In vendor mode the relay does not speak the printer protocol itself. It
//! hands the formatted receipt text to an external integration, selected by
//! name, and reports whether that integration *accepted* the text. Whether
//! paper actually came out is the integration's business.
//!
//! The stock integration is a program that reads the receipt on stdin, such
//! as `lp` (CUPS) or a vendor-supplied spooler.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::error::RelayError;

/// External integration that accepts receipt text.
#[async_trait]
pub trait VendorIntegration: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &str;

    /// Hand over the text. `Ok` means the integration accepted it.
    async fn submit(&self, text: &str) -> Result<(), RelayError>;
}

/// Integration backed by an external program reading stdin.
#[derive(Debug, Clone)]
pub struct CommandIntegration {
    program: String,
    args: Vec<String>,
}

impl CommandIntegration {
    /// Parse a command line such as `"lp -d kitchen"` (whitespace separated).
    pub fn from_command_line(command: &str) -> Result<Self, RelayError> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| RelayError::Config("vendor integration is empty".to_string()))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

#[async_trait]
impl VendorIntegration for CommandIntegration {
    fn name(&self) -> &str {
        &self.program
    }

    async fn submit(&self, text: &str) -> Result<(), RelayError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| RelayError::Vendor(format!("Failed to start {}: {}", self.program, e)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .await
                .map_err(|e| RelayError::Vendor(format!("Write to {} failed: {}", self.program, e)))?;
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| RelayError::Vendor(format!("{} did not finish: {}", self.program, e)))?;

        if output.status.success() {
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            Err(RelayError::Vendor(format!(
                "{} rejected the job ({}): {}",
                self.program,
                output.status,
                stderr.trim()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command_line() {
        let integration = CommandIntegration::from_command_line("lp -d kitchen").unwrap();
        assert_eq!(integration.name(), "lp");
        assert_eq!(integration.args, vec!["-d", "kitchen"]);
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(matches!(
            CommandIntegration::from_command_line("  "),
            Err(RelayError::Config(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_accepting_program() {
        let integration = CommandIntegration::from_command_line("cat").unwrap();
        integration.submit("Burger x2\n").await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_rejecting_program() {
        let integration = CommandIntegration::from_command_line("false").unwrap();
        let err = integration.submit("Burger x2\n").await.unwrap_err();
        assert!(matches!(err, RelayError::Vendor(_)));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let integration =
            CommandIntegration::from_command_line("kds-relay-no-such-program").unwrap();
        assert!(integration.submit("x").await.is_err());
    }
}
