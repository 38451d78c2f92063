/// Request tokenizing: split a command line into a command and its args.
use anyhow::{bail, Context, Result};

use prforge_core::Command;

/// A request as received: a raw command line or an already split one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Text(String),
    Tokens(Vec<String>),
}

impl From<&str> for Request {
    fn from(text: &str) -> Self {
        Request::Text(text.to_string())
    }
}

impl From<String> for Request {
    fn from(text: String) -> Self {
        Request::Text(text)
    }
}

impl From<Vec<String>> for Request {
    fn from(tokens: Vec<String>) -> Self {
        Request::Tokens(tokens)
    }
}

/// Parse a request into a [`Command`].
///
/// Text is split with POSIX shell quoting. A lone apostrophe (`don't`) is
/// escaped first so it cannot open a quote that never closes.
pub fn tokenize(request: Request) -> Result<Command> {
    let tokens = match request {
        Request::Text(text) => {
            let escaped = text.replace('\'', "\\'");
            shell_words::split(&escaped)
                .with_context(|| format!("Failed to tokenize request: {text}"))?
        }
        Request::Tokens(tokens) => tokens,
    };

    let mut tokens = tokens.into_iter();
    let Some(name) = tokens.next() else {
        bail!("empty request");
    };
    Ok(Command {
        name,
        args: tokens.collect(),
    })
}
