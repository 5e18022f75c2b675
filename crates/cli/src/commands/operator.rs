//! Operator password commands.
//!
//! # Usage
//!
//! ```bash
//! # Prompts on a terminal, otherwise reads the first line of stdin
//! pgd-cli operator hash-password
//! echo 'correct horse' | pgd-cli operator hash-password
//! ```
//!
//! The printed PHC string goes into `ADMIN_PASSWORD_HASH`.

use std::io::{BufRead, IsTerminal, Write};

use pg_delivery_admin::services::{AuthError, hash_password};
use thiserror::Error;

/// Errors that can occur while hashing.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Reading the password failed.
    #[error("Failed to read password: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing was entered.
    #[error("No password given")]
    Empty,

    /// The password was rejected or hashing failed.
    #[error(transparent)]
    Auth(#[from] AuthError),
}

fn read_password() -> Result<String, OperatorError> {
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        let mut stderr = std::io::stderr();
        write!(stderr, "Operator password: ")?;
        stderr.flush()?;
    }

    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;
    let password = line.trim_end_matches(['\r', '\n']).to_owned();
    if password.is_empty() {
        return Err(OperatorError::Empty);
    }
    Ok(password)
}

/// Read a password and print its Argon2id hash.
pub fn hash() -> Result<(), OperatorError> {
    let password = read_password()?;
    let hash = hash_password(&password)?;

    #[allow(clippy::print_stdout)]
    {
        println!("{hash}");
    }
    Ok(())
}
