//! Interactive approval of proxied requests (`--manual`)

use std::io::{self, BufRead, Write};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("Request rejected by operator")]
    Denied,

    #[error("Failed to read approval from terminal: {0}")]
    Io(String),
}

/// Empty input, `y` and `yes` approve
pub fn parse_approval(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "" | "y" | "yes")
}

/// Write the prompt to `output` and read one answer from `input`
///
/// End of input is an error, never an approval.
pub fn prompt_approval<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<(), ApprovalError> {
    let io_err = |e: io::Error| ApprovalError::Io(e.to_string());

    write!(output, "Approve this request? [Y/n] ").map_err(io_err)?;
    output.flush().map_err(io_err)?;

    let mut line = String::new();
    if input.read_line(&mut line).map_err(io_err)? == 0 {
        warn!("Approval prompt hit end of input, rejecting request");
        return Err(ApprovalError::Io("stdin closed".to_string()));
    }

    if parse_approval(&line) {
        Ok(())
    } else {
        warn!("Request rejected by operator");
        Err(ApprovalError::Denied)
    }
}

/// Prompt on the server terminal and wait for an answer
///
/// The blocking stdin read runs on the blocking thread pool.
pub async fn await_approval() -> Result<(), ApprovalError> {
    tokio::task::spawn_blocking(|| prompt_approval(&mut io::stdin().lock(), &mut io::stdout()))
        .await
        .map_err(|e| ApprovalError::Io(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_approving_answers() {
        assert!(parse_approval(""));
        assert!(parse_approval("\n"));
        assert!(parse_approval("y"));
        assert!(parse_approval("YES\n"));
    }

    #[test]
    fn test_rejecting_answers() {
        assert!(!parse_approval("n"));
        assert!(!parse_approval("no"));
        assert!(!parse_approval("yep"));
    }

    #[test]
    fn test_prompt_approves_enter() {
        let mut output = Vec::new();
        assert!(prompt_approval(&mut Cursor::new("\n"), &mut output).is_ok());
        assert_eq!(output, b"Approve this request? [Y/n] ");
    }

    #[test]
    fn test_prompt_rejects_no() {
        let result = prompt_approval(&mut Cursor::new("n\n"), &mut Vec::new());
        assert!(matches!(result, Err(ApprovalError::Denied)));
    }

    #[test]
    fn test_prompt_at_end_of_input_is_not_approval() {
        let result = prompt_approval(&mut Cursor::new(""), &mut Vec::new());
        assert!(matches!(result, Err(ApprovalError::Io(ref m)) if m == "stdin closed"));
    }
}
