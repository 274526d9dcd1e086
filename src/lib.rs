// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Kubernetes object YAML tooling.
//!
//! Kubedoc splits, merges, validates, and deterministically sorts
//! multi-document Kubernetes YAML streams. It also drives clusters, their
//! namespaces, and their objects through kubectl, using an injected command
//! executor so that all of that logic can run without a live cluster.
//!
//! # See Also
//!
//! 1. [`yaml`]
//! 2. [`object`]
//! 3. [`kube`]

pub mod config;
pub mod context;
pub mod exec;
pub mod kube;
pub mod object;
pub mod path;
pub mod yaml;

pub use config::{CreateObjectOptions, CreateResourceOptions, KubectlSettings};
pub use context::{CancelToken, Context};
pub use exec::{CommandExecutor, CommandOutput, CommandRequest, SystemExecutor};
pub use kube::{
    cluster::CommandExecutorKubernetes,
    namespace::CommandExecutorNamespace,
    object::{CommandExecutorObject, CommandExecutorResource},
    KubeError, KubernetesCluster, KubernetesNamespace, KubernetesObject,
};
pub use object::{
    is_before_in_alphabet, sort_objects_yaml, sort_resources_yaml, unmarshal_object_yaml,
    ObjectYamlEntry,
};
pub use yaml::{merge_multi_yaml, split_multi_yaml};
