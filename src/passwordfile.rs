// SPDX-License-Identifier: Apache-2.0
// Copyright 2026 OSM Client Authors

use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PasswordFileError {
    /// The file could not be read
    #[error("could not read password file '{path}'")]
    Unreadable {
        path: String,
        source: std::io::Error,
    },
}

/// Credentials extracted from a password file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Credentials {
    /// User and password both taken from the file
    Pair { user: String, password: String },
    /// A new password for the already-configured user
    PasswordOnly(String),
}

/// Read a password file and apply the line conventions.
///
/// # Arguments
///
/// * `path` the file to read
/// * `current_user` the currently configured user, consulted by the
///   multi-line convention
pub fn read_credentials(
    path: impl AsRef<Path>,
    current_user: Option<&str>,
) -> Result<Option<Credentials>, PasswordFileError> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| {
        PasswordFileError::Unreadable {
            path: path.display().to_string(),
            source: e,
        }
    })?;
    Ok(extract_credentials(&contents, current_user))
}

/// Extract credentials from password file contents.
///
/// Lines are trimmed, empty lines dropped, and lines starting with `#` are
/// comments. Data lines hold `user:password`, split on the first `:`. The
/// convention depends on how many non-empty lines remain:
///
/// * one line: a non-comment line supplies both user and password; a lone
///   comment supplies nothing.
/// * two lines: only the comment-then-data shape supplies credentials, taken
///   from the second line. Every other combination supplies nothing.
/// * three or more lines: the file acts as a lookup table. Comment lines are
///   skipped and the password of the last data line whose user equals
///   `current_user` is taken; the user itself is never changed.
///
/// A data line without a `:` supplies nothing.
pub fn extract_credentials(
    contents: &str,
    current_user: Option<&str>,
) -> Option<Credentials> {
    let lines: Vec<&str> = contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    match *lines.as_slice() {
        [] => None,
        [line] => {
            if is_comment(line) {
                None
            } else {
                pair_from(line)
            }
        }
        [first, second] => {
            if is_comment(first) && !is_comment(second) {
                pair_from(second)
            } else {
                None
            }
        }
        _ => {
            let mut password = None;
            for line in &lines {
                if is_comment(line) {
                    continue;
                }
                if let Some((user, pwd)) = line.split_once(':') {
                    if Some(user) == current_user {
                        password = Some(pwd);
                    }
                }
            }
            password.map(|p| Credentials::PasswordOnly(p.to_string()))
        }
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with('#')
}

fn pair_from(line: &str) -> Option<Credentials> {
    line.split_once(':').map(|(user, password)| Credentials::Pair {
        user: user.to_string(),
        password: password.to_string(),
    })
}
