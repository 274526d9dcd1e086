// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Object access through a command executor.

use crate::{
    config::CreateObjectOptions,
    context::Context,
    exec::CommandExecutor,
    kube::{
        cluster::CommandExecutorKubernetes, kubectl::namespace_flag,
        namespace::CommandExecutorNamespace, report, require_name, KubeError, KubernetesCluster,
        KubernetesObject, Result,
    },
    yaml::set_object_identity,
};

use tracing::{info, instrument};

/// Object of a kubectl driven cluster.
///
/// Objects with an empty namespace are cluster-scoped.
#[derive(Debug)]
pub struct CommandExecutorObject<'a, E>
where
    E: CommandExecutor,
{
    cluster: &'a CommandExecutorKubernetes<E>,
    kind: String,
    name: String,
    namespace: String,
}

/// Resource of a kubectl driven cluster.
pub type CommandExecutorResource<'a, E> = CommandExecutorObject<'a, E>;

impl<'a, E> CommandExecutorObject<'a, E>
where
    E: CommandExecutor,
{
    /// Construct new object handle.
    ///
    /// # Errors
    ///
    /// - Return [`KubeError::EmptyName`] if kind or name is empty.
    pub fn new(
        cluster: &'a CommandExecutorKubernetes<E>,
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Result<Self> {
        let kind = kind.into();
        let name = name.into();
        require_name("object kind", &kind)?;
        require_name("object name", &name)?;

        Ok(Self {
            cluster,
            kind,
            name,
            namespace: namespace.into(),
        })
    }

    /// Namespace of object, or `None` if cluster-scoped.
    pub fn namespace(&self) -> Option<CommandExecutorNamespace<'a, E>> {
        CommandExecutorNamespace::new(self.cluster, self.namespace.clone()).ok()
    }

    fn target_args(&self, verb: &str) -> Vec<String> {
        let mut args = vec![verb.to_owned(), self.kind.clone(), self.name.clone()];
        args.extend(namespace_flag(&self.namespace));
        args
    }

    fn describe(&self) -> String {
        if self.namespace.is_empty() {
            format!("{} {:?}", self.kind, self.name)
        } else {
            format!("{} {:?} in namespace {:?}", self.kind, self.name, self.namespace)
        }
    }
}

impl<E> KubernetesObject for CommandExecutorObject<'_, E>
where
    E: CommandExecutor,
{
    fn kind(&self) -> &str {
        self.kind.as_str()
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }

    fn namespace_name(&self) -> &str {
        self.namespace.as_str()
    }

    #[instrument(skip(self, ctx), fields(object = %self.describe()), level = "debug")]
    fn exists(&self, ctx: &Context) -> Result<bool> {
        let mut args = self.target_args("get");
        args.extend(["-o".to_owned(), "name".to_owned()]);

        let request = self.cluster.kubectl(ctx, args)?;
        self.cluster.probe(ctx, &request)
    }

    /// Create object from YAML unless it already exists.
    ///
    /// The parent namespace is created first unless the options say to skip
    /// it. The name and namespace of the given YAML are overwritten with the
    /// identity of this handle before the YAML is applied.
    #[instrument(skip(self, ctx, options), fields(object = %self.describe()), level = "debug")]
    fn create_by_yaml_string(&self, ctx: &Context, options: &CreateObjectOptions) -> Result<()> {
        options.validate()?;

        if self.exists(ctx)? {
            report(ctx, format!("{} already exists", self.describe()));
            return Ok(());
        }

        if !options.skip_namespace_creation && !self.namespace.is_empty() {
            self.cluster.create_namespace_by_name(ctx, &self.namespace)?;
        }

        let yaml = set_object_identity(&options.yaml_string, &self.name, &self.namespace)?;
        self.cluster.apply_yaml_string(ctx, &yaml)?;
        info!("created {}", self.describe());

        Ok(())
    }

    #[instrument(skip(self, ctx), fields(object = %self.describe()), level = "debug")]
    fn delete(&self, ctx: &Context) -> Result<()> {
        if !self.exists(ctx)? {
            report(ctx, format!("{} already absent", self.describe()));
            return Ok(());
        }

        let request = self.cluster.kubectl(ctx, self.target_args("delete"))?;
        self.cluster.run(ctx, &request)?;
        info!("deleted {}", self.describe());

        Ok(())
    }

    fn get_as_yaml_string(&self, ctx: &Context) -> Result<String> {
        let mut args = self.target_args("get");
        args.extend(["-o".to_owned(), "yaml".to_owned()]);

        let request = self.cluster.kubectl(ctx, args)?;
        match self.cluster.run(ctx, &request) {
            Ok(output) => Ok(output.stdout),
            Err(KubeError::Kubectl { failure, .. }) if failure.is_not_found() => {
                Err(KubeError::NotFound {
                    kind: self.kind.clone(),
                    name: self.name.clone(),
                    namespace: self.namespace.clone(),
                })
            }
            Err(err) => Err(err),
        }
    }
}
