// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Multi-document YAML handling.
//!
//! Kubernetes manifests are commonly exchanged as a __multi-document__ YAML
//! stream, i.e., a series of YAML documents where each document begins with
//! a `---` marker line. Kubectl reads and writes this format, so kubedoc needs
//! to break such streams apart into individual documents, and glue them back
//! together again.
//!
//! # Text Fidelity
//!
//! Splitting and merging are done on the raw text, NOT on parsed YAML. Thus,
//! comments and blank lines inside of a document survive a round trip. The
//! only normalization performed is the removal of trailing whitespace per
//! line, and the removal of blank lines surrounding a document.
//!
//! # Round Trip
//!
//! For any multi-document stream `x` built from well-formed documents,
//! `merge_multi_yaml(&split_multi_yaml(x))` yields the same documents in the
//! same order, each prefixed by exactly one `---` line, and each ending with
//! exactly one line break.

use regex::Regex;
use serde_yaml::{Mapping, Value};
use std::{borrow::Cow, sync::LazyLock};

/// Line that separates documents in a multi-document stream.
pub const DOCUMENT_MARKER: &str = "---";

static LEADING_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^---[^\n]*(\n|$)").expect("leading marker pattern is valid"));

/// Split multi-document YAML stream into individual documents.
///
/// Each returned document is prefixed with `"---\n"`, and ends with exactly
/// one line break. Marker lines that do not close an in-progress document are
/// skipped, so leading or consecutive markers never produce empty documents.
/// Input that is empty, or only holds whitespace, produces no documents.
pub fn split_multi_yaml(input: impl AsRef<str>) -> Vec<String> {
    let mut documents = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in input.as_ref().lines() {
        let line = line.trim_end();
        if line == DOCUMENT_MARKER {
            push_document(&mut documents, &current);
            current.clear();
            continue;
        }

        current.push(line);
    }
    push_document(&mut documents, &current);

    documents
}

fn push_document(documents: &mut Vec<String>, lines: &[&str]) {
    // INVARIANT: Only lines between the first and last non-blank line count.
    let Some(start) = lines.iter().position(|line| !line.is_empty()) else {
        return;
    };
    let end = lines
        .iter()
        .rposition(|line| !line.is_empty())
        .map_or(start, |index| index + 1);

    let mut document = format!("{DOCUMENT_MARKER}\n");
    for line in &lines[start..end] {
        document.push_str(line);
        document.push('\n');
    }

    documents.push(document);
}

/// Merge listing of documents into one multi-document YAML stream.
///
/// Each document is normalized before being appended: trailing whitespace is
/// trimmed, leading blank lines are dropped, a single leading `---` line is
/// dropped, and leading blank lines are dropped again. Documents that end up
/// empty are skipped. Every surviving document is emitted as `"---\n"`
/// followed by its body and exactly one line break.
///
/// An empty listing produces an empty string.
pub fn merge_multi_yaml(documents: &[impl AsRef<str>]) -> String {
    let mut merged = String::new();
    for document in documents {
        let body = normalize_document(document.as_ref());
        if body.is_empty() {
            continue;
        }

        merged.push_str(DOCUMENT_MARKER);
        merged.push('\n');
        merged.push_str(&body);
        merged.push('\n');
    }

    merged
}

fn normalize_document(document: &str) -> Cow<'_, str> {
    let document = strip_leading_blank_lines(document.trim_end());
    match LEADING_MARKER.replace(document, "") {
        Cow::Borrowed(body) => Cow::Borrowed(strip_leading_blank_lines(body)),
        Cow::Owned(body) => Cow::Owned(strip_leading_blank_lines(&body).to_owned()),
    }
}

fn strip_leading_blank_lines(mut text: &str) -> &str {
    while let Some((line, rest)) = text.split_once('\n') {
        if !line.trim().is_empty() {
            break;
        }
        text = rest;
    }

    if text.trim().is_empty() {
        ""
    } else {
        text
    }
}

/// Check that a single document is valid YAML.
///
/// # Errors
///
/// - Return [`YamlError::Parse`] if the document cannot be parsed.
pub fn validate_yaml(document: impl AsRef<str>) -> Result<()> {
    serde_yaml::from_str::<Value>(document.as_ref())?;
    Ok(())
}

/// Force `.metadata.name` and `.metadata.namespace` of an object document.
///
/// Parses the document, rewrites its identity fields, and serializes it back
/// with a leading `---` marker. The `metadata` mapping is created if missing.
/// An empty namespace removes `.metadata.namespace`, which is how
/// cluster-scoped objects are expressed.
///
/// Comments do not survive this operation.
///
/// # Errors
///
/// - Return [`YamlError::Parse`] if the document cannot be parsed.
/// - Return [`YamlError::NotAMapping`] if the document, or its metadata field,
///   is not a mapping.
pub fn set_object_identity(
    document: impl AsRef<str>,
    name: impl AsRef<str>,
    namespace: impl AsRef<str>,
) -> Result<String> {
    let mut value: Value = serde_yaml::from_str(document.as_ref())?;
    let Value::Mapping(root) = &mut value else {
        return Err(YamlError::NotAMapping { field: "." });
    };

    let metadata = root
        .entry(Value::from("metadata"))
        .or_insert(Value::Mapping(Mapping::new()));
    if metadata.is_null() {
        *metadata = Value::Mapping(Mapping::new());
    }
    let Value::Mapping(metadata) = metadata else {
        return Err(YamlError::NotAMapping { field: ".metadata" });
    };

    metadata.insert(Value::from("name"), Value::from(name.as_ref()));
    if namespace.as_ref().is_empty() {
        metadata.remove("namespace");
    } else {
        metadata.insert(Value::from("namespace"), Value::from(namespace.as_ref()));
    }

    Ok(format!("{DOCUMENT_MARKER}\n{}", serde_yaml::to_string(&value)?))
}

/// YAML handling error types.
#[derive(Debug, thiserror::Error)]
pub enum YamlError {
    /// Document is not valid YAML.
    #[error(transparent)]
    Parse(#[from] serde_yaml::Error),

    /// Expected a mapping at the given field path.
    #[error("expected YAML mapping at {field:?}")]
    NotAMapping { field: &'static str },
}

/// Friendly result alias :3
pub type Result<T, E = YamlError> = std::result::Result<T, E>;
