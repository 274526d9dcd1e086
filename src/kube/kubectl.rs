// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Kubectl text output handling.
//!
//! Kubectl reports everything as text. These utilities turn the bits of text
//! that kubedoc depends on into structured values.

use crate::exec::CommandOutput;

use std::fmt::{Display, Formatter, Result as FmtResult};

const SERVER_ERROR_PREFIX: &str = "Error from server (";
const NOT_FOUND_REASON: &str = "NotFound";

/// Failed kubectl invocation.
///
/// Kubectl reports errors returned by the API server as
/// `Error from server (<Reason>): <message>`. The reason is extracted so that
/// callers can match on it instead of on the raw text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KubectlFailure {
    pub exit_code: Option<i32>,

    /// Status reason reported by the API server, e.g., "NotFound".
    pub reason: Option<String>,

    /// Error output of kubectl.
    pub message: String,
}

impl KubectlFailure {
    /// Classify output of failed kubectl invocation.
    pub fn from_output(output: &CommandOutput) -> Self {
        let message = output.stderr.trim_end().to_owned();
        let reason = message.lines().find_map(|line| {
            line.trim_start()
                .strip_prefix(SERVER_ERROR_PREFIX)
                .and_then(|rest| rest.split_once(')'))
                .map(|(reason, _)| reason.to_owned())
        });

        Self {
            exit_code: output.exit_code,
            reason,
            message,
        }
    }

    /// Check if failure means that the target does not exist.
    pub fn is_not_found(&self) -> bool {
        // INVARIANT: Fall back to plain text search for reports that do not
        //   follow the server error layout.
        self.reason.as_deref() == Some(NOT_FOUND_REASON)
            || self.message.contains(&format!("({NOT_FOUND_REASON})"))
    }
}

impl Display for KubectlFailure {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        match self.exit_code {
            Some(code) => write!(fmt, "kubectl exited with {code}")?,
            None => write!(fmt, "kubectl was terminated")?,
        }

        if !self.message.is_empty() {
            write!(fmt, ": {}", self.message)?;
        }

        Ok(())
    }
}

impl std::error::Error for KubectlFailure {}

/// Entry of `kubectl config get-contexts --no-headers`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct KubectlContext {
    pub current: bool,
    pub name: String,
    pub cluster: String,
    pub auth_info: String,
    pub namespace: Option<String>,
}

/// Parse listing of `kubectl config get-contexts --no-headers`.
///
/// Each line holds an optional `*` marking the current context, followed by
/// the name, cluster, auth info, and optional namespace columns. Lines with
/// fewer columns are skipped.
pub fn parse_contexts(listing: &str) -> Vec<KubectlContext> {
    listing
        .lines()
        .filter_map(|line| {
            let mut columns = line.split_whitespace().peekable();
            let current = columns.next_if_eq(&"*").is_some();
            let name = columns.next()?;
            let cluster = columns.next()?;
            let auth_info = columns.next()?;

            Some(KubectlContext {
                current,
                name: name.to_owned(),
                cluster: cluster.to_owned(),
                auth_info: auth_info.to_owned(),
                namespace: columns.next().map(str::to_owned),
            })
        })
        .collect()
}

/// Parse listing of `kubectl get ... -o name`.
///
/// Strips the `<resource>/` prefix of every line, e.g., `deployment.apps/web`
/// becomes `web`. Blank lines are skipped.
pub fn parse_names(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| line.split_once('/').map_or(line, |(_, name)| name))
        .map(str::to_owned)
        .collect()
}

/// Flags selecting a namespace, empty for cluster-scoped targets.
pub fn namespace_flag(namespace: &str) -> Vec<String> {
    if namespace.is_empty() {
        Vec::new()
    } else {
        vec!["--namespace".into(), namespace.into()]
    }
}
