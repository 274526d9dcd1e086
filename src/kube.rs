// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Kubernetes access through kubectl.
//!
//! Kubedoc models a Kubernetes cluster as three layers of capabilities: the
//! __cluster__ itself, the __namespaces__ inside of it, and the __objects__
//! inside of a namespace. Each layer is described by a trait, i.e.,
//! [`KubernetesCluster`], [`KubernetesNamespace`], and [`KubernetesObject`].
//!
//! # Command Executor Adapters
//!
//! The only implementation shipped with kubedoc shells out to kubectl through
//! an injected [`CommandExecutor`](crate::exec::CommandExecutor). Each call is
//! one synchronous kubectl invocation, or a short sequence of them executed
//! strictly in order, e.g., "ensure namespace" always completes before
//! "apply object".
//!
//! # Object Lifecycle
//!
//! An object starts out unknown. Checking its existence tells whether it is
//! absent or present. Creation moves an absent object to present, and
//! deletion moves a present object to absent. Both are idempotent: creating a
//! present object, or deleting an absent object, logs and succeeds without
//! invoking kubectl again.
//!
//! Absence is detected from kubectl's `Error from server (NotFound)` report.
//! Every other kubectl failure is propagated to the caller as-is.
//!
//! # Contexts
//!
//! Outside of a cluster every kubectl invocation is pinned to a kubectl
//! context through `--context`. The context is either configured explicitly,
//! or looked up from `kubectl config get-contexts` by cluster name. Inside of
//! a cluster, in-cluster authentication is used instead, and `--context` is
//! omitted entirely.

pub mod cluster;
pub mod kubectl;
pub mod namespace;
pub mod object;

use crate::{config::CreateObjectOptions, context::Context};

use std::fmt::Display;
use tracing::{debug, info};

/// Cluster level capabilities.
pub trait KubernetesCluster {
    /// Name of cluster.
    fn name(&self) -> &str;

    /// Check if namespace exists.
    fn namespace_by_name_exists(&self, ctx: &Context, name: &str) -> Result<bool>;

    /// Create namespace unless it already exists.
    fn create_namespace_by_name(&self, ctx: &Context, name: &str) -> Result<()>;

    /// Delete namespace unless it is already absent.
    fn delete_namespace_by_name(&self, ctx: &Context, name: &str) -> Result<()>;

    /// List names of all namespaces in sorted order.
    fn list_namespace_names(&self, ctx: &Context) -> Result<Vec<String>>;

    /// Apply multi-document YAML stream to cluster.
    fn apply_yaml_string(&self, ctx: &Context, yaml: &str) -> Result<()>;
}

/// Namespace level capabilities.
pub trait KubernetesNamespace {
    /// Name of namespace.
    fn name(&self) -> &str;

    /// Check if namespace exists.
    fn exists(&self, ctx: &Context) -> Result<bool>;

    /// Create namespace unless it already exists.
    fn create(&self, ctx: &Context) -> Result<()>;

    /// Delete namespace unless it is already absent.
    fn delete(&self, ctx: &Context) -> Result<()>;

    /// List names of all objects of a kind in namespace.
    fn list_object_names(&self, ctx: &Context, kind: &str) -> Result<Vec<String>>;
}

/// Object level capabilities.
pub trait KubernetesObject {
    /// Kind, or resource type, of object, e.g., "deployment" or "configmap".
    fn kind(&self) -> &str;

    /// Name of object.
    fn name(&self) -> &str;

    /// Namespace of object, empty if cluster-scoped.
    fn namespace_name(&self) -> &str;

    /// Check if object exists.
    fn exists(&self, ctx: &Context) -> Result<bool>;

    /// Create object from YAML unless it already exists.
    fn create_by_yaml_string(&self, ctx: &Context, options: &CreateObjectOptions) -> Result<()>;

    /// Delete object unless it is already absent.
    fn delete(&self, ctx: &Context) -> Result<()>;

    /// Current YAML representation of object.
    fn get_as_yaml_string(&self, ctx: &Context) -> Result<String>;
}

// Idempotent no-ops are only worth reporting when the caller asked for it.
pub(crate) fn report(ctx: &Context, message: impl Display) {
    if ctx.verbose {
        info!("{message}");
    } else {
        debug!("{message}");
    }
}

pub(crate) fn require_name(what: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(KubeError::EmptyName { what });
    }

    Ok(())
}

/// Kubernetes access error types.
#[derive(Debug, thiserror::Error)]
pub enum KubeError {
    /// Required identifier was empty.
    #[error("{what} not set")]
    EmptyName { what: &'static str },

    /// Kubectl reported failure.
    #[error("kubectl call {command:?} failed")]
    Kubectl {
        command: String,
        #[source]
        failure: kubectl::KubectlFailure,
    },

    /// Object does not exist.
    #[error("{kind} {name:?} not found in namespace {namespace:?}")]
    NotFound {
        kind: String,
        name: String,
        namespace: String,
    },

    /// No kubectl context matches the cluster.
    #[error("no kubectl context found for cluster {cluster:?}")]
    NoContext { cluster: String },

    /// Kubectl could not be executed.
    #[error(transparent)]
    Exec(#[from] crate::exec::ExecError),

    /// Object YAML could not be rewritten.
    #[error(transparent)]
    Yaml(#[from] crate::yaml::YamlError),

    /// Creation options are invalid.
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// Friendly result alias :3
pub type Result<T, E = KubeError> = std::result::Result<T, E>;
