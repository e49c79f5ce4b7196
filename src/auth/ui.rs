use std::fmt;
use std::io::{self, BufRead, Write};

use super::{AuthManager, KeySource};

const KEY_PROMPT: &str = "Enter your assistant API key: ";
const INVALID_CHOICE_MSG: &str = "Invalid choice";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationChoice {
    Yes,
    No,
    Cancel,
}

#[derive(Debug, Clone)]
pub struct UiError {
    message: String,
}

impl UiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for UiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UiError {}

pub fn parse_confirmation(input: &str) -> Result<ConfirmationChoice, UiError> {
    match input.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(ConfirmationChoice::Yes),
        "" | "n" | "no" => Ok(ConfirmationChoice::No),
        "q" | "quit" | "cancel" => Ok(ConfirmationChoice::Cancel),
        _ => Err(UiError::new(INVALID_CHOICE_MSG)),
    }
}

/// A blank line means the user gave up.
pub fn parse_api_key(input: &str) -> Option<String> {
    let key = input.trim();
    (!key.is_empty()).then(|| key.to_string())
}

fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W, text: &str) -> Result<String, UiError> {
    write!(output, "{text}").map_err(|err| UiError::new(err.to_string()))?;
    output.flush().map_err(|err| UiError::new(err.to_string()))?;
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|err| UiError::new(err.to_string()))?;
    Ok(line)
}

pub fn prompt_api_key<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
) -> Result<Option<String>, UiError> {
    writeln!(output, "🔐 Storyteller Authentication Setup")
        .map_err(|err| UiError::new(err.to_string()))?;
    writeln!(output, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
        .map_err(|err| UiError::new(err.to_string()))?;
    let line = prompt(input, output, KEY_PROMPT)?;
    Ok(parse_api_key(&line))
}

pub fn interactive_auth(manager: &AuthManager) -> Result<(), Box<dyn std::error::Error>> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();

    let Some(key) = prompt_api_key(&mut input, &mut output)? else {
        println!("Cancelled.");
        return Ok(());
    };
    manager.store_key(&key)?;
    println!("✅ Stored API key in the system keyring");
    Ok(())
}

pub fn interactive_deauth(manager: &AuthManager) -> Result<(), Box<dyn std::error::Error>> {
    if manager.stored_key()?.is_none() {
        println!("No API key is stored in the keyring.");
        if let Ok((_, KeySource::Environment)) = manager.resolve_api_key() {
            println!("(The environment variable {} is still set.)", super::ENV_API_KEY);
        }
        return Ok(());
    }

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    let answer = prompt(
        &mut input,
        &mut output,
        "Are you sure you want to remove the stored API key? (y/N): ",
    )?;

    match parse_confirmation(&answer)? {
        ConfirmationChoice::Yes => {
            if manager.remove_key()? {
                println!("✅ Removed API key from the keyring");
            }
        }
        ConfirmationChoice::No | ConfirmationChoice::Cancel => println!("Cancelled."),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn confirmation_defaults_to_no() {
        assert_eq!(parse_confirmation("\n").unwrap(), ConfirmationChoice::No);
        assert_eq!(parse_confirmation("YES").unwrap(), ConfirmationChoice::Yes);
        assert_eq!(parse_confirmation("q").unwrap(), ConfirmationChoice::Cancel);
        assert!(parse_confirmation("maybe").is_err());
    }

    #[test]
    fn api_key_is_trimmed_and_blank_cancels() {
        let mut input = Cursor::new("  sk-test-123 \n");
        let mut output = Vec::new();
        let key = prompt_api_key(&mut input, &mut output).expect("prompt");
        assert_eq!(key.as_deref(), Some("sk-test-123"));
        assert!(String::from_utf8_lossy(&output).contains(KEY_PROMPT));

        let mut input = Cursor::new("\n");
        let key = prompt_api_key(&mut input, &mut Vec::new()).expect("prompt");
        assert_eq!(key, None);
    }
}
