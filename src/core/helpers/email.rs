#![allow(clippy::result_large_err)]

use crate::core::error::AppError;
use crate::core::types::ErrorCategory;
use serde_json::Value;
use std::collections::HashSet;

/// Normalize a recipient list given as delimited text or an array of strings.
///
/// `Name <addr>` forms are reduced to the address, the domain is lowercased and duplicates are
/// dropped case-insensitively while keeping the first occurrence.
pub fn normalize_email_list(value: &Value) -> Result<Vec<String>, AppError> {
    let raw: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::String(text) => split_addresses(text),
        Value::Array(items) => {
            let mut collected = Vec::new();
            for item in items {
                match item {
                    Value::String(text) => collected.extend(split_addresses(text)),
                    Value::Null => {}
                    other => {
                        return Err(AppError::new(
                            ErrorCategory::ValidationError,
                            format!("email list entries must be strings, got {}", other),
                        ))
                    }
                }
            }
            collected
        }
        other => {
            return Err(AppError::new(
                ErrorCategory::ValidationError,
                format!("email list must be a string or an array, got {}", other),
            ))
        }
    };

    let mut seen = HashSet::new();
    let mut normalized = Vec::new();
    let mut invalid = Vec::new();
    for entry in raw {
        match normalize_email(&entry) {
            Some(address) => {
                if seen.insert(address.to_ascii_lowercase()) {
                    normalized.push(address);
                }
            }
            None => invalid.push(entry),
        }
    }

    if !invalid.is_empty() {
        return Err(AppError::new(
            ErrorCategory::ValidationError,
            format!("invalid email address(es): {}", invalid.join(", ")),
        ));
    }
    Ok(normalized)
}

/// Normalize one address, returning `None` when it is not a plausible mailbox.
pub fn normalize_email(input: &str) -> Option<String> {
    let trimmed = input.trim();
    let address = match (trimmed.rfind('<'), trimmed.rfind('>')) {
        (Some(start), Some(end)) if start < end => &trimmed[start + 1..end],
        _ => trimmed,
    }
    .trim();

    let (local, domain) = address.rsplit_once('@')?;
    if local.is_empty()
        || domain.is_empty()
        || domain.starts_with('.')
        || domain.ends_with('.')
        || local.contains('@')
        || address.chars().any(char::is_whitespace)
    {
        return None;
    }
    Some(format!("{}@{}", local, domain.to_ascii_lowercase()))
}

/// Split on `,`, `;` and line breaks outside quoted display names and `<...>` addresses.
fn split_addresses(text: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut angle = false;
    for ch in text.chars() {
        match ch {
            '"' if !angle => quoted = !quoted,
            '<' if !quoted => angle = true,
            '>' if !quoted => angle = false,
            ',' | ';' | '\n' | '\r' if !quoted && !angle => {
                parts.push(std::mem::take(&mut current));
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    parts.push(current);

    parts
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}
