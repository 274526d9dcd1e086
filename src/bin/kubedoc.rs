// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use kubedoc::{
    config::KubectlSettings,
    object::{sort_objects_yaml, unmarshal_object_yaml},
    path::default_config_path,
    yaml::{merge_multi_yaml, split_multi_yaml},
    CommandExecutorKubernetes, Context, CreateObjectOptions, KubernetesCluster, KubernetesObject,
    SystemExecutor,
};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::{
    fs::read_to_string,
    io::{self, Write},
    path::{Path, PathBuf},
    process::exit,
    time::Duration,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Debug, Clone, Parser)]
#[command(
    about,
    override_usage = "\n  kubedoc [options] <yaml-command> [file]\n  kubedoc [options] <kubectl-command> --cluster <cluster> ...",
    subcommand_help_heading = "Commands",
    version
)]
struct Cli {
    /// Path to kubectl settings file.
    #[arg(long, global = true, value_name = "path")]
    pub config: Option<PathBuf>,

    /// Report idempotent no-ops.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Give up on kubectl after this many seconds.
    #[arg(long, global = true, value_name = "seconds")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    fn run(self) -> Result<()> {
        let mut ctx = Context::new().with_verbose(self.verbose);
        if let Some(seconds) = self.timeout {
            ctx = ctx.with_timeout(Duration::from_secs(seconds));
        }
        let config = self.config;

        match self.command {
            Command::Split(opts) => run_split(opts),
            Command::Merge(opts) => run_merge(opts),
            Command::Sort(opts) => run_sort(opts),
            Command::Validate(opts) => run_validate(opts),
            Command::Exists(opts) => run_exists(&ctx, config, opts),
            Command::Get(opts) => run_get(&ctx, config, opts),
            Command::Create(opts) => run_create(&ctx, config, opts),
            Command::Delete(opts) => run_delete(&ctx, config, opts),
            Command::Namespaces(opts) => run_namespaces(&ctx, config, opts),
            Command::Context(opts) => run_context(&ctx, config, opts),
        }
    }
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Split multi-document YAML into normalized documents.
    #[command(override_usage = "kubedoc split [options] [file]")]
    Split(InputOptions),

    /// Merge YAML files into one multi-document stream.
    #[command(override_usage = "kubedoc merge [options] <file>...")]
    Merge(MergeOptions),

    /// Sort objects by namespace, name, and kind.
    #[command(override_usage = "kubedoc sort [options] [file]")]
    Sort(InputOptions),

    /// Check that every document is a valid Kubernetes object.
    #[command(override_usage = "kubedoc validate [options] [file]")]
    Validate(InputOptions),

    /// Check if object exists in cluster.
    #[command(override_usage = "kubedoc exists [options] --cluster <cluster> <kind> <name>")]
    Exists(ObjectOptions),

    /// Print object of cluster as YAML.
    #[command(override_usage = "kubedoc get [options] --cluster <cluster> <kind> <name>")]
    Get(ObjectOptions),

    /// Create object in cluster from YAML unless it exists.
    #[command(override_usage = "kubedoc create [options] --cluster <cluster> <kind> <name> [file]")]
    Create(CreateOptions),

    /// Delete object from cluster unless it is absent.
    #[command(override_usage = "kubedoc delete [options] --cluster <cluster> <kind> <name>")]
    Delete(ObjectOptions),

    /// List namespaces of cluster.
    #[command(override_usage = "kubedoc namespaces [options] --cluster <cluster>")]
    Namespaces(ClusterOptions),

    /// Show kubectl context used for cluster.
    #[command(override_usage = "kubedoc context [options] --cluster <cluster>")]
    Context(ClusterOptions),
}

#[derive(Args, Clone, Debug)]
struct InputOptions {
    /// YAML file to read, or "-" for standard input.
    #[arg(default_value = "-", value_name = "file")]
    pub file: PathBuf,
}

#[derive(Args, Clone, Debug)]
struct MergeOptions {
    /// YAML files to merge in order.
    #[arg(required = true, value_name = "file")]
    pub files: Vec<PathBuf>,
}

#[derive(Args, Clone, Debug)]
struct ClusterOptions {
    /// Name of cluster to target.
    #[arg(short, long, value_name = "cluster")]
    pub cluster: String,
}

#[derive(Args, Clone, Debug)]
struct ObjectOptions {
    #[command(flatten)]
    pub target: ClusterOptions,

    /// Kind of object, e.g., "deployment".
    #[arg(value_name = "kind")]
    pub kind: String,

    /// Name of object.
    #[arg(value_name = "name")]
    pub name: String,

    /// Namespace of object, omit for cluster-scoped objects.
    #[arg(short, long, default_value = "", value_name = "namespace")]
    pub namespace: String,
}

#[derive(Args, Clone, Debug)]
struct CreateOptions {
    #[command(flatten)]
    pub object: ObjectOptions,

    /// YAML file describing object, or "-" for standard input.
    #[arg(default_value = "-", value_name = "file")]
    pub file: PathBuf,

    /// Do not create the namespace of the object.
    #[arg(long)]
    pub skip_namespace_creation: bool,
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_timer(false)
        .without_time()
        .with_writer(io::stderr);
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        return Ok(io::read_to_string(io::stdin())?);
    }

    Ok(read_to_string(path)?)
}

fn print(output: impl AsRef<str>) -> Result<()> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(output.as_ref().as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn open_cluster(
    config: Option<PathBuf>,
    cluster: String,
) -> Result<CommandExecutorKubernetes<SystemExecutor>> {
    let path = match config {
        Some(path) => path,
        None => default_config_path()?,
    };
    let settings = KubectlSettings::load(path)?;

    Ok(CommandExecutorKubernetes::new(
        cluster,
        settings,
        SystemExecutor::new(),
    )?)
}

fn run_split(opts: InputOptions) -> Result<()> {
    print(split_multi_yaml(read_input(&opts.file)?).concat())
}

fn run_merge(opts: MergeOptions) -> Result<()> {
    let documents = opts
        .files
        .iter()
        .map(|file| read_input(file))
        .collect::<Result<Vec<_>>>()?;
    print(merge_multi_yaml(&documents))
}

fn run_sort(opts: InputOptions) -> Result<()> {
    print(sort_objects_yaml(read_input(&opts.file)?)?)
}

fn run_validate(opts: InputOptions) -> Result<()> {
    let entries = unmarshal_object_yaml(read_input(&opts.file)?)?;
    for entry in &entries {
        info!(
            "{}/{} {:?} in namespace {:?}",
            entry.api_version(),
            entry.kind(),
            entry.name(),
            entry.namespace()
        );
    }
    info!("{} valid objects", entries.len());

    Ok(())
}

fn run_exists(ctx: &Context, config: Option<PathBuf>, opts: ObjectOptions) -> Result<()> {
    let cluster = open_cluster(config, opts.target.cluster)?;
    let object = cluster.object_by_names(opts.kind, opts.name, opts.namespace)?;
    print(format!("{}\n", object.exists(ctx)?))
}

fn run_get(ctx: &Context, config: Option<PathBuf>, opts: ObjectOptions) -> Result<()> {
    let cluster = open_cluster(config, opts.target.cluster)?;
    let object = cluster.object_by_names(opts.kind, opts.name, opts.namespace)?;
    print(object.get_as_yaml_string(ctx)?)
}

fn run_create(ctx: &Context, config: Option<PathBuf>, opts: CreateOptions) -> Result<()> {
    let options = CreateObjectOptions::new(read_input(&opts.file)?)
        .with_skip_namespace_creation(opts.skip_namespace_creation);
    let object = opts.object;
    let cluster = open_cluster(config, object.target.cluster)?;
    cluster
        .object_by_names(object.kind, object.name, object.namespace)?
        .create_by_yaml_string(ctx, &options)?;

    Ok(())
}

fn run_delete(ctx: &Context, config: Option<PathBuf>, opts: ObjectOptions) -> Result<()> {
    let cluster = open_cluster(config, opts.target.cluster)?;
    cluster
        .object_by_names(opts.kind, opts.name, opts.namespace)?
        .delete(ctx)?;

    Ok(())
}

fn run_namespaces(ctx: &Context, config: Option<PathBuf>, opts: ClusterOptions) -> Result<()> {
    let cluster = open_cluster(config, opts.cluster)?;
    let mut listing = String::new();
    for name in cluster.list_namespace_names(ctx)? {
        listing.push_str(&name);
        listing.push('\n');
    }

    print(listing)
}

fn run_context(ctx: &Context, config: Option<PathBuf>, opts: ClusterOptions) -> Result<()> {
    let cluster = open_cluster(config, opts.cluster)?;
    if cluster.settings().uses_in_cluster_authentication() {
        info!("in-cluster authentication in use, no kubectl context needed");
        return Ok(());
    }

    print(format!("{}\n", cluster.kubectl_context(ctx)?))
}
