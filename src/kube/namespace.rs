// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Namespace access through a command executor.

use crate::{
    context::Context,
    exec::CommandExecutor,
    kube::{
        cluster::CommandExecutorKubernetes,
        kubectl::{self, namespace_flag},
        object::CommandExecutorObject,
        require_name, KubernetesCluster, KubernetesNamespace, Result,
    },
};

/// Namespace of a kubectl driven cluster.
#[derive(Debug)]
pub struct CommandExecutorNamespace<'a, E>
where
    E: CommandExecutor,
{
    cluster: &'a CommandExecutorKubernetes<E>,
    name: String,
}

impl<'a, E> CommandExecutorNamespace<'a, E>
where
    E: CommandExecutor,
{
    /// Construct new namespace handle.
    ///
    /// # Errors
    ///
    /// - Return [`KubeError::EmptyName`](crate::kube::KubeError::EmptyName)
    ///   if the namespace name is empty.
    pub fn new(cluster: &'a CommandExecutorKubernetes<E>, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        require_name("namespace name", &name)?;

        Ok(Self { cluster, name })
    }

    /// Cluster owning namespace.
    pub fn cluster(&self) -> &'a CommandExecutorKubernetes<E> {
        self.cluster
    }

    /// Handle to object inside of namespace.
    ///
    /// # Errors
    ///
    /// - Return [`KubeError::EmptyName`](crate::kube::KubeError::EmptyName)
    ///   if kind or name is empty.
    pub fn object_by_names(
        &self,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<CommandExecutorObject<'a, E>> {
        CommandExecutorObject::new(self.cluster, kind, name, self.name.clone())
    }
}

impl<E> KubernetesNamespace for CommandExecutorNamespace<'_, E>
where
    E: CommandExecutor,
{
    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn exists(&self, ctx: &Context) -> Result<bool> {
        self.cluster.namespace_by_name_exists(ctx, &self.name)
    }

    fn create(&self, ctx: &Context) -> Result<()> {
        self.cluster.create_namespace_by_name(ctx, &self.name)
    }

    fn delete(&self, ctx: &Context) -> Result<()> {
        self.cluster.delete_namespace_by_name(ctx, &self.name)
    }

    fn list_object_names(&self, ctx: &Context, kind: &str) -> Result<Vec<String>> {
        require_name("object kind", kind)?;
        let mut args = vec!["get".to_owned(), kind.to_owned()];
        args.extend(namespace_flag(&self.name));
        args.extend(["-o".to_owned(), "name".to_owned()]);

        let request = self.cluster.kubectl(ctx, args)?;
        let output = self.cluster.run(ctx, &request)?;

        Ok(kubectl::parse_names(&output.stdout))
    }
}
