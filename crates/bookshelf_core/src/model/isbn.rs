//! ISBN syntax and canonical form.
//!
//! # Responsibility
//! - Decide whether a string is a syntactically valid ISBN-10 or ISBN-13.
//! - Produce the canonical spelling used as a book's storage key.
//!
//! # Invariants
//! - Validation never touches the network.
//! - An `Isbn` value always holds a canonical, checksum-valid ISBN.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Canonical, checksum-valid ISBN.
///
/// Hyphens and spaces are stripped and an ISBN-10 check character `x` is
/// upper-cased, so `978-0-13-235088-4` and `9780132350884` are the same key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Isbn(String);

/// Reason an input string is not an ISBN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IsbnError {
    Blank,
    /// Wrong length or characters outside `0-9`/`X`.
    Malformed(String),
    /// ISBN-13 without a `978`/`979` prefix.
    UnknownPrefix(String),
    Checksum(String),
}

impl Display for IsbnError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank => write!(f, "isbn must not be blank"),
            Self::Malformed(value) => write!(f, "`{value}` is not an ISBN-10 or ISBN-13"),
            Self::UnknownPrefix(value) => {
                write!(f, "`{value}` does not start with 978 or 979")
            }
            Self::Checksum(value) => write!(f, "`{value}` has an invalid check digit"),
        }
    }
}

impl Error for IsbnError {}

impl Isbn {
    /// Parses and canonicalizes an ISBN-10 or ISBN-13.
    pub fn parse(raw: &str) -> Result<Self, IsbnError> {
        let canonical = canonicalize(raw);
        if canonical.is_empty() {
            return Err(IsbnError::Blank);
        }

        match canonical.len() {
            10 => check_isbn10(&canonical)?,
            13 => check_isbn13(&canonical)?,
            _ => return Err(IsbnError::Malformed(canonical)),
        }

        if canonical.bytes().all(|byte| byte == b'0') {
            return Err(IsbnError::Malformed(canonical));
        }

        Ok(Self(canonical))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_isbn13(&self) -> bool {
        self.0.len() == 13
    }
}

impl Display for Isbn {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Isbn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Isbn {
    type Error = IsbnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Isbn> for String {
    fn from(value: Isbn) -> Self {
        value.0
    }
}

/// Syntactic ISBN check (format and checksum only).
pub fn is_valid_isbn(raw: &str) -> bool {
    Isbn::parse(raw).is_ok()
}

/// Strips separators and upper-cases a trailing `x`.
///
/// Does not validate; returns whatever remains after normalization.
pub fn canonicalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|ch| *ch != '-' && !ch.is_whitespace())
        .map(|ch| ch.to_ascii_uppercase())
        .collect()
}

fn check_isbn10(value: &str) -> Result<(), IsbnError> {
    let mut sum = 0u32;
    for (index, ch) in value.chars().enumerate() {
        let digit = match ch {
            '0'..='9' => ch as u32 - '0' as u32,
            'X' if index == 9 => 10,
            _ => return Err(IsbnError::Malformed(value.to_string())),
        };
        sum += digit * (10 - index as u32);
    }

    if sum % 11 != 0 {
        return Err(IsbnError::Checksum(value.to_string()));
    }
    Ok(())
}

fn check_isbn13(value: &str) -> Result<(), IsbnError> {
    if !value.bytes().all(|byte| byte.is_ascii_digit()) {
        return Err(IsbnError::Malformed(value.to_string()));
    }
    if !(value.starts_with("978") || value.starts_with("979")) {
        return Err(IsbnError::UnknownPrefix(value.to_string()));
    }

    let sum: u32 = value
        .bytes()
        .enumerate()
        .map(|(index, byte)| {
            let digit = u32::from(byte - b'0');
            if index % 2 == 0 {
                digit
            } else {
                digit * 3
            }
        })
        .sum();

    if sum % 10 != 0 {
        return Err(IsbnError::Checksum(value.to_string()));
    }
    Ok(())
}
