// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT


use kubedoc::{
    exec::{self, CommandExecutor, CommandOutput, CommandRequest},
    unmarshal_object_yaml, Context,
};
use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
};

/// In-memory stand-in for kubectl.
///
/// Understands the subset of kubectl that kubedoc invokes, and keeps track
/// of namespaces and objects the way a cluster would.
#[derive(Debug, Default)]
pub(crate) struct FakeKubectl {
    state: RefCell<FakeState>,
}

#[derive(Debug, Default)]
struct FakeState {
    contexts: String,
    namespaces: BTreeSet<String>,
    objects: BTreeMap<ObjectKey, String>,
    calls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct ObjectKey {
    kind: String,
    namespace: String,
    name: String,
}

impl ObjectKey {
    fn new(kind: &str, namespace: &str, name: &str) -> Self {
        Self {
            kind: kind.to_lowercase(),
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl FakeKubectl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_contexts(self, listing: impl Into<String>) -> Self {
        self.state.borrow_mut().contexts = listing.into();
        self
    }

    pub(crate) fn with_namespace(self, name: impl Into<String>) -> Self {
        self.state.borrow_mut().namespaces.insert(name.into());
        self
    }

    /// Every kubectl invocation so far, rendered as command line.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.state.borrow().calls.clone()
    }

    /// Invocations that change cluster state.
    pub(crate) fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| {
                call.contains(" apply ") || call.contains(" create ") || call.contains(" delete ")
            })
            .collect()
    }

    pub(crate) fn has_namespace(&self, name: &str) -> bool {
        self.state.borrow().namespaces.contains(name)
    }

    fn dispatch(&self, args: &[String], stdin: Option<&str>) -> CommandOutput {
        let mut state = self.state.borrow_mut();
        let (namespace, args) = take_namespace(args);
        let args = args.iter().map(String::as_str).collect::<Vec<_>>();

        match args.as_slice() {
            ["config", "get-contexts", "--no-headers"] => ok(&state.contexts),
            ["cluster-info"] => ok("Kubernetes control plane is running\n"),
            ["get", "namespaces", "-o", "name"] => ok(&state
                .namespaces
                .iter()
                .map(|name| format!("namespace/{name}\n"))
                .collect::<String>()),
            ["get", "namespace", name, "-o", "name"] => {
                if state.namespaces.contains(*name) {
                    ok(&format!("namespace/{name}\n"))
                } else {
                    not_found("namespaces", name)
                }
            }
            ["create", "namespace", name] => {
                if !state.namespaces.insert(name.to_string()) {
                    return failed(&format!(
                        "Error from server (AlreadyExists): namespaces \"{name}\" already exists"
                    ));
                }
                ok(&format!("namespace/{name} created\n"))
            }
            ["delete", "namespace", name] => {
                if !state.namespaces.remove(*name) {
                    return not_found("namespaces", name);
                }
                state.objects.retain(|key, _| key.namespace != *name);
                ok(&format!("namespace \"{name}\" deleted\n"))
            }
            ["apply", "-f", "-"] => apply(&mut state, stdin.unwrap_or_default()),
            ["get", kind, "-o", "name"] => ok(&state
                .objects
                .keys()
                .filter(|key| key.kind == kind.to_lowercase() && key.namespace == namespace)
                .map(|key| format!("{}/{}\n", key.kind, key.name))
                .collect::<String>()),
            ["get", kind, name, "-o", output] => {
                match state.objects.get(&ObjectKey::new(kind, &namespace, name)) {
                    Some(content) if *output == "yaml" => ok(content),
                    Some(_) => ok(&format!("{}/{name}\n", kind.to_lowercase())),
                    None => not_found(kind, name),
                }
            }
            ["delete", kind, name] => {
                match state.objects.remove(&ObjectKey::new(kind, &namespace, name)) {
                    Some(_) => ok(&format!("{} \"{name}\" deleted\n", kind.to_lowercase())),
                    None => not_found(kind, name),
                }
            }
            _ => failed(&format!("error: unknown command {args:?}")),
        }
    }
}

impl CommandExecutor for FakeKubectl {
    fn run(&self, ctx: &Context, request: &CommandRequest) -> exec::Result<CommandOutput> {
        ctx.check().map_err(|reason| exec::ExecError::Cancelled {
            command: request.to_string(),
            reason,
        })?;
        self.state.borrow_mut().calls.push(request.to_string());

        // INVARIANT: Global flags come first, and are irrelevant to the fake.
        let mut args = request.args.as_slice();
        while let [flag, _, rest @ ..] = args {
            if flag != "--context" && flag != "--kubeconfig" {
                break;
            }
            args = rest;
        }

        Ok(self.dispatch(args, request.stdin.as_deref()))
    }
}

fn take_namespace(args: &[String]) -> (String, Vec<String>) {
    let mut namespace = String::new();
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--namespace" {
            namespace = iter.next().cloned().unwrap_or_default();
        } else {
            rest.push(arg.clone());
        }
    }

    (namespace, rest)
}

fn apply(state: &mut FakeState, stdin: &str) -> CommandOutput {
    let entries = match unmarshal_object_yaml(stdin) {
        Ok(entries) => entries,
        Err(err) => return failed(&format!("error: error parsing STDIN: {err}")),
    };

    let mut report = String::new();
    for entry in entries {
        let namespace = entry.namespace();
        if !namespace.is_empty() && !state.namespaces.contains(&namespace) {
            return not_found("namespaces", &namespace);
        }

        let key = ObjectKey::new(&entry.kind(), &namespace, &entry.name());
        report.push_str(&format!("{}/{} configured\n", key.kind, key.name));
        state.objects.insert(key, entry.into_content());
    }

    ok(&report)
}

fn ok(stdout: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(0),
        stdout: stdout.into(),
        stderr: String::new(),
    }
}

fn failed(stderr: &str) -> CommandOutput {
    CommandOutput {
        exit_code: Some(1),
        stdout: String::new(),
        stderr: format!("{stderr}\n"),
    }
}

fn not_found(kind: &str, name: &str) -> CommandOutput {
    failed(&format!(
        "Error from server (NotFound): {kind} \"{name}\" not found"
    ))
}
