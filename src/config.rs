// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the settings that decide how kubedoc invokes kubectl, and the
//! options records handed to object creation.

use serde::{Deserialize, Serialize};
use std::{
    env,
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Default location of the service account token mounted into pods.
pub const DEFAULT_SERVICE_ACCOUNT_TOKEN: &str =
    "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Environment variable set by the kubelet for every pod.
pub const SERVICE_HOST_ENV: &str = "KUBERNETES_SERVICE_HOST";

/// Settings for kubectl invocations.
///
/// # General Layout
///
/// ```toml
/// kubectl = "kubectl"
/// context = "prod"
/// kubeconfig = "$HOME/.kube/config"
/// in_cluster = "auto"
/// service_account_token = "/var/run/secrets/kubernetes.io/serviceaccount/token"
/// ```
///
/// Every field is optional.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct KubectlSettings {
    /// Kubectl binary to invoke.
    pub kubectl: String,

    /// Kubectl context to use instead of looking one up by cluster name.
    pub context: Option<String>,

    /// Kubeconfig file to pass to kubectl.
    pub kubeconfig: Option<PathBuf>,

    /// Whether to rely on in-cluster authentication.
    pub in_cluster: InClusterMode,

    /// Service account token whose presence signals in-cluster authentication.
    pub service_account_token: PathBuf,
}

impl Default for KubectlSettings {
    fn default() -> Self {
        Self {
            kubectl: "kubectl".into(),
            context: None,
            kubeconfig: None,
            in_cluster: InClusterMode::default(),
            service_account_token: PathBuf::from(DEFAULT_SERVICE_ACCOUNT_TOKEN),
        }
    }
}

impl KubectlSettings {
    /// Load settings from file.
    ///
    /// Falls back to default settings if the file does not exist.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if the file exists, but cannot be read.
    /// - Return [`ConfigError::Deserialize`] if the file cannot be parsed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("no settings at {:?}, using defaults", path.display());
            return Ok(Self::default());
        }

        read_to_string(path)
            .map_err(|source| ConfigError::Read {
                source,
                path: path.to_path_buf(),
            })?
            .parse()
    }

    /// Check if kubectl should rely on in-cluster authentication.
    ///
    /// In-cluster authentication means that no `--context` flag is passed.
    pub fn uses_in_cluster_authentication(&self) -> bool {
        match self.in_cluster {
            InClusterMode::Always => true,
            InClusterMode::Never => false,
            InClusterMode::Auto => {
                is_in_cluster_authentication_available(&self.service_account_token)
            }
        }
    }
}

impl FromStr for KubectlSettings {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut settings: KubectlSettings =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on path fields.
        settings.kubeconfig = settings.kubeconfig.as_deref().map(expand_path).transpose()?;
        settings.service_account_token = expand_path(&settings.service_account_token)?;

        Ok(settings)
    }
}

impl Display for KubectlSettings {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

fn expand_path(path: &Path) -> Result<PathBuf> {
    Ok(PathBuf::from(
        shellexpand::full(path.to_string_lossy().as_ref())?.into_owned(),
    ))
}

/// When to use in-cluster authentication.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InClusterMode {
    /// Detect from the environment.
    #[default]
    Auto,

    /// Always omit `--context`.
    Always,

    /// Always pass `--context`.
    Never,
}

/// Check if in-cluster authentication is available.
///
/// True when running inside of a pod, i.e., the kubelet provided the service
/// host environment variable, and a service account token is mounted.
pub fn is_in_cluster_authentication_available(token_path: impl AsRef<Path>) -> bool {
    let has_service_host = env::var(SERVICE_HOST_ENV).is_ok_and(|host| !host.is_empty());
    has_service_host && token_path.as_ref().is_file()
}

/// Options for creating an object from YAML.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct CreateObjectOptions {
    /// YAML document describing the object.
    pub yaml_string: String,

    /// Do not create the parent namespace of the object.
    pub skip_namespace_creation: bool,
}

/// Options for creating a resource from YAML.
pub type CreateResourceOptions = CreateObjectOptions;

impl CreateObjectOptions {
    /// Construct new creation options.
    pub fn new(yaml_string: impl Into<String>) -> Self {
        Self {
            yaml_string: yaml_string.into(),
            skip_namespace_creation: false,
        }
    }

    /// Set whether to skip parent namespace creation.
    pub fn with_skip_namespace_creation(mut self, skip: bool) -> Self {
        self.skip_namespace_creation = skip;
        self
    }

    /// Validate creation options.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::EmptyYaml`] if no YAML was given.
    pub fn validate(&self) -> Result<()> {
        if self.yaml_string.trim().is_empty() {
            return Err(ConfigError::EmptyYaml);
        }

        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read settings file.
    #[error("failed to read settings at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// Creation options carry no YAML.
    #[error("YAML string not set")]
    EmptyYaml,
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
