// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Cluster access through a command executor.

use crate::{
    config::KubectlSettings,
    context::Context,
    exec::{CommandExecutor, CommandOutput, CommandRequest, SystemExecutor},
    kube::{
        kubectl::{self, KubectlContext, KubectlFailure},
        namespace::CommandExecutorNamespace,
        object::CommandExecutorObject,
        report, require_name, KubeError, KubernetesCluster, Result,
    },
};

use std::cell::OnceCell;
use tracing::{debug, info, instrument};

/// Kubernetes cluster driven by kubectl.
#[derive(Debug, Clone)]
pub struct CommandExecutorKubernetes<E = SystemExecutor>
where
    E: CommandExecutor,
{
    name: String,
    settings: KubectlSettings,
    executor: E,
    context: OnceCell<String>,
}

impl<E> CommandExecutorKubernetes<E>
where
    E: CommandExecutor,
{
    /// Construct new cluster adapter.
    ///
    /// # Errors
    ///
    /// - Return [`KubeError::EmptyName`] if the cluster name is empty.
    pub fn new(name: impl Into<String>, settings: KubectlSettings, executor: E) -> Result<Self> {
        let name = name.into();
        require_name("cluster name", &name)?;

        Ok(Self {
            name,
            settings,
            executor,
            context: OnceCell::new(),
        })
    }

    /// Settings used for kubectl invocations.
    pub fn settings(&self) -> &KubectlSettings {
        &self.settings
    }

    /// Executor running kubectl.
    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Handle to namespace of cluster.
    ///
    /// # Errors
    ///
    /// - Return [`KubeError::EmptyName`] if the namespace name is empty.
    pub fn namespace_by_name(
        &self,
        name: impl Into<String>,
    ) -> Result<CommandExecutorNamespace<'_, E>> {
        CommandExecutorNamespace::new(self, name)
    }

    /// Handle to object of cluster.
    ///
    /// An empty namespace refers to a cluster-scoped object.
    ///
    /// # Errors
    ///
    /// - Return [`KubeError::EmptyName`] if kind or name is empty.
    pub fn object_by_names(
        &self,
        kind: impl Into<String>,
        name: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Result<CommandExecutorObject<'_, E>> {
        CommandExecutorObject::new(self, kind, name, namespace)
    }

    /// List kubectl contexts known to the local kubeconfig.
    ///
    /// # Errors
    ///
    /// - Return [`KubeError::Kubectl`] if kubectl fails.
    pub fn list_contexts(&self, ctx: &Context) -> Result<Vec<KubectlContext>> {
        let request = self
            .base_request()
            .args(["config", "get-contexts", "--no-headers"]);
        let output = self.run(ctx, &request)?;

        Ok(kubectl::parse_contexts(&output.stdout))
    }

    /// Determine kubectl context to use for this cluster.
    ///
    /// Uses the configured context if any. Otherwise picks the context whose
    /// name equals the cluster name, or failing that, the first context whose
    /// cluster column equals the cluster name. The looked up context is
    /// cached, so kubectl is only asked once per adapter.
    ///
    /// # Errors
    ///
    /// - Return [`KubeError::NoContext`] if no context matches.
    /// - Return [`KubeError::Kubectl`] if kubectl fails.
    #[instrument(skip(self, ctx), level = "debug")]
    pub fn kubectl_context(&self, ctx: &Context) -> Result<String> {
        if let Some(context) = &self.settings.context {
            return Ok(context.clone());
        }

        if let Some(context) = self.context.get() {
            return Ok(context.clone());
        }

        let contexts = self.list_contexts(ctx)?;
        let found = contexts
            .iter()
            .find(|context| context.name == self.name)
            .or_else(|| contexts.iter().find(|context| context.cluster == self.name))
            .map(|context| context.name.clone())
            .ok_or_else(|| KubeError::NoContext {
                cluster: self.name.clone(),
            })?;
        debug!("kubectl context of {:?} is {found:?}", self.name);

        Ok(self.context.get_or_init(|| found).clone())
    }

    /// Check that the cluster answers kubectl.
    ///
    /// # Errors
    ///
    /// - Return [`KubeError::Kubectl`] if the cluster cannot be reached.
    pub fn check_accessible(&self, ctx: &Context) -> Result<()> {
        let request = self.kubectl(ctx, ["cluster-info"])?;
        self.run(ctx, &request)?;
        Ok(())
    }

    fn base_request(&self) -> CommandRequest {
        let request = CommandRequest::new(&self.settings.kubectl);
        match &self.settings.kubeconfig {
            Some(path) => request.args(["--kubeconfig".into(), path.to_string_lossy().into_owned()]),
            None => request,
        }
    }

    /// Build kubectl invocation pinned to this cluster.
    pub(crate) fn kubectl(
        &self,
        ctx: &Context,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<CommandRequest> {
        let mut request = self.base_request();
        if !self.settings.uses_in_cluster_authentication() {
            request = request.args(["--context".into(), self.kubectl_context(ctx)?]);
        }

        Ok(request.args(args))
    }

    /// Run kubectl, and fail on any non-zero exit.
    pub(crate) fn run(&self, ctx: &Context, request: &CommandRequest) -> Result<CommandOutput> {
        let output = self.executor.run(ctx, request)?;
        if !output.success() {
            return Err(KubeError::Kubectl {
                command: request.to_string(),
                failure: KubectlFailure::from_output(&output),
            });
        }

        Ok(output)
    }

    /// Run kubectl, and report whether its target exists.
    pub(crate) fn probe(&self, ctx: &Context, request: &CommandRequest) -> Result<bool> {
        let output = self.executor.run(ctx, request)?;
        if output.success() {
            return Ok(true);
        }

        let failure = KubectlFailure::from_output(&output);
        if failure.is_not_found() {
            return Ok(false);
        }

        Err(KubeError::Kubectl {
            command: request.to_string(),
            failure,
        })
    }
}

impl<E> KubernetesCluster for CommandExecutorKubernetes<E>
where
    E: CommandExecutor,
{
    fn name(&self) -> &str {
        self.name.as_str()
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn namespace_by_name_exists(&self, ctx: &Context, name: &str) -> Result<bool> {
        require_name("namespace name", name)?;
        let request = self.kubectl(ctx, ["get", "namespace", name, "-o", "name"])?;
        self.probe(ctx, &request)
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn create_namespace_by_name(&self, ctx: &Context, name: &str) -> Result<()> {
        if self.namespace_by_name_exists(ctx, name)? {
            report(
                ctx,
                format!("namespace {name:?} already exists in cluster {:?}", self.name),
            );
            return Ok(());
        }

        let request = self.kubectl(ctx, ["create", "namespace", name])?;
        self.run(ctx, &request)?;
        info!("created namespace {name:?} in cluster {:?}", self.name);

        Ok(())
    }

    #[instrument(skip(self, ctx), level = "debug")]
    fn delete_namespace_by_name(&self, ctx: &Context, name: &str) -> Result<()> {
        if !self.namespace_by_name_exists(ctx, name)? {
            report(
                ctx,
                format!("namespace {name:?} already absent from cluster {:?}", self.name),
            );
            return Ok(());
        }

        let request = self.kubectl(ctx, ["delete", "namespace", name])?;
        self.run(ctx, &request)?;
        info!("deleted namespace {name:?} from cluster {:?}", self.name);

        Ok(())
    }

    fn list_namespace_names(&self, ctx: &Context) -> Result<Vec<String>> {
        let request = self.kubectl(ctx, ["get", "namespaces", "-o", "name"])?;
        let mut names = kubectl::parse_names(&self.run(ctx, &request)?.stdout);
        names.sort();

        Ok(names)
    }

    #[instrument(skip(self, ctx, yaml), level = "debug")]
    fn apply_yaml_string(&self, ctx: &Context, yaml: &str) -> Result<()> {
        if yaml.trim().is_empty() {
            return Err(crate::config::ConfigError::EmptyYaml.into());
        }

        let request = self.kubectl(ctx, ["apply", "-f", "-"])?.stdin(yaml);
        let output = self.run(ctx, &request)?;
        report(ctx, output.stdout.trim_end());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InClusterMode;
    use pretty_assertions::assert_eq;
    use std::{cell::RefCell, collections::VecDeque};

    /// Replays canned outputs, and records every request.
    ///
    /// Succeeds silently once the canned outputs run out.
    #[derive(Default)]
    struct Replay {
        outputs: RefCell<VecDeque<CommandOutput>>,
        requests: RefCell<Vec<CommandRequest>>,
    }

    impl Replay {
        fn with(outputs: impl IntoIterator<Item = (i32, &'static str, &'static str)>) -> Self {
            let outputs = outputs
                .into_iter()
                .map(|(code, stdout, stderr)| CommandOutput {
                    exit_code: Some(code),
                    stdout: stdout.into(),
                    stderr: stderr.into(),
                })
                .collect();

            Self {
                outputs: RefCell::new(outputs),
                ..Default::default()
            }
        }

        fn argv(&self) -> Vec<String> {
            self.requests
                .borrow()
                .iter()
                .map(ToString::to_string)
                .collect()
        }
    }

    impl CommandExecutor for Replay {
        fn run(
            &self,
            _ctx: &Context,
            request: &CommandRequest,
        ) -> crate::exec::Result<CommandOutput> {
            self.requests.borrow_mut().push(request.clone());
            let output = self.outputs.borrow_mut().pop_front();
            Ok(output.unwrap_or(CommandOutput {
                exit_code: Some(0),
                ..Default::default()
            }))
        }
    }

    fn settings(in_cluster: InClusterMode) -> KubectlSettings {
        KubectlSettings {
            in_cluster,
            ..Default::default()
        }
    }

    #[test]
    fn new_rejects_empty_name() {
        let result = CommandExecutorKubernetes::new("", KubectlSettings::default(), Replay::default());
        assert!(matches!(result, Err(KubeError::EmptyName { .. })));
    }

    #[test]
    fn kubectl_context_prefers_name_then_cluster() -> anyhow::Result<()> {
        let listing = "*  other  dev  admin\n   dev-ctx  dev  admin\n   dev  x  admin\n";
        let replay = Replay::with([(0, listing, "")]);
        let cluster = CommandExecutorKubernetes::new("dev", settings(InClusterMode::Never), &replay)?;
        assert_eq!(cluster.kubectl_context(&Context::new())?, "dev");

        let replay = Replay::with([(0, "*  other  dev  admin\n", "")]);
        let cluster = CommandExecutorKubernetes::new("dev", settings(InClusterMode::Never), &replay)?;
        assert_eq!(cluster.kubectl_context(&Context::new())?, "other");
        assert_eq!(replay.argv(), vec!["kubectl config get-contexts --no-headers"]);

        Ok(())
    }

    #[test]
    fn kubectl_context_is_looked_up_once() -> anyhow::Result<()> {
        let replay = Replay::with([(0, "*  dev  dev  admin\n", "")]);
        let cluster = CommandExecutorKubernetes::new("dev", settings(InClusterMode::Never), &replay)?;
        let ctx = Context::new();

        cluster.list_namespace_names(&ctx)?;
        cluster.check_accessible(&ctx)?;
        assert_eq!(
            replay.argv(),
            vec![
                "kubectl config get-contexts --no-headers",
                "kubectl --context dev get namespaces -o name",
                "kubectl --context dev cluster-info",
            ]
        );

        Ok(())
    }

    #[test]
    fn kubectl_context_missing() -> anyhow::Result<()> {
        let replay = Replay::with([(0, "*  other  prod  admin\n", "")]);
        let cluster = CommandExecutorKubernetes::new("dev", settings(InClusterMode::Never), &replay)?;
        assert!(matches!(
            cluster.kubectl_context(&Context::new()),
            Err(KubeError::NoContext { .. })
        ));

        Ok(())
    }

    #[test]
    fn in_cluster_mode_omits_context() -> anyhow::Result<()> {
        let replay = Replay::with([(0, "namespace/b\nnamespace/a\n", "")]);
        let cluster =
            CommandExecutorKubernetes::new("dev", settings(InClusterMode::Always), &replay)?;

        let names = cluster.list_namespace_names(&Context::new())?;
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(replay.argv(), vec!["kubectl get namespaces -o name"]);

        Ok(())
    }

    #[test]
    fn configured_context_and_kubeconfig_are_passed() -> anyhow::Result<()> {
        let replay = Replay::default();
        let settings = KubectlSettings {
            kubectl: "/opt/kubectl".into(),
            context: Some("prod".into()),
            kubeconfig: Some("/etc/kube/config".into()),
            in_cluster: InClusterMode::Never,
            ..Default::default()
        };
        let cluster = CommandExecutorKubernetes::new("prod", settings, &replay)?;

        cluster.check_accessible(&Context::new())?;
        assert_eq!(
            replay.argv(),
            vec!["/opt/kubectl --kubeconfig /etc/kube/config --context prod cluster-info"]
        );

        Ok(())
    }

    #[test]
    fn namespace_exists_classifies_failures() -> anyhow::Result<()> {
        let replay = Replay::with([
            (0, "namespace/a\n", ""),
            (1, "", "Error from server (NotFound): namespaces \"b\" not found\n"),
            (1, "", "Error from server (Forbidden): namespaces \"c\" is forbidden\n"),
        ]);
        let cluster =
            CommandExecutorKubernetes::new("dev", settings(InClusterMode::Always), &replay)?;
        let ctx = Context::new();

        assert!(cluster.namespace_by_name_exists(&ctx, "a")?);
        assert!(!cluster.namespace_by_name_exists(&ctx, "b")?);
        match cluster.namespace_by_name_exists(&ctx, "c") {
            Err(KubeError::Kubectl { failure, .. }) => {
                assert_eq!(failure.reason.as_deref(), Some("Forbidden"));
            }
            other => panic!("expected kubectl failure, got {other:?}"),
        }
        assert!(matches!(
            cluster.namespace_by_name_exists(&ctx, ""),
            Err(KubeError::EmptyName { .. })
        ));

        Ok(())
    }

    #[test]
    fn apply_yaml_string_pipes_stdin() -> anyhow::Result<()> {
        let replay = Replay::with([(0, "configmap/a created\n", "")]);
        let cluster =
            CommandExecutorKubernetes::new("dev", settings(InClusterMode::Always), &replay)?;

        cluster.apply_yaml_string(&Context::new(), "kind: ConfigMap\n")?;
        let requests = replay.requests.borrow();
        assert_eq!(requests[0].args, vec!["apply", "-f", "-"]);
        assert_eq!(requests[0].stdin.as_deref(), Some("kind: ConfigMap\n"));

        assert!(matches!(
            cluster.apply_yaml_string(&Context::new(), "  "),
            Err(KubeError::Config(_))
        ));

        Ok(())
    }
}
