// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Kubernetes object YAML model.
//!
//! An __object entry__ is one Kubernetes object kept as its raw YAML document.
//! The identifying fields of an object, i.e., its name, kind, API version,
//! and namespace, are never cached. They are extracted on demand by partially
//! deserializing the document into a minimal structure that only targets the
//! field of interest. Thus, a malformed `metadata` section does not prevent
//! the kind from being read, and vice versa.
//!
//! # Ordering
//!
//! Objects are ordered by the composite key (namespace, name, kind) under
//! [`alphabetic_cmp`]. The empty string sorts before any other string, which
//! places cluster-scoped objects in front of namespaced ones.

use crate::yaml::{self, merge_multi_yaml, split_multi_yaml, YamlError};

use serde::{de::DeserializeOwned, Deserialize};
use std::cmp::Ordering;
use tracing::{debug, instrument};

/// One Kubernetes object as a raw YAML document.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ObjectYamlEntry {
    content: String,
}

impl ObjectYamlEntry {
    /// Construct new object entry from YAML document.
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Raw YAML document of object.
    pub fn content(&self) -> &str {
        self.content.as_str()
    }

    /// Take raw YAML document out of entry.
    pub fn into_content(self) -> String {
        self.content
    }

    /// Look up identifying field of object.
    ///
    /// Returns `Ok(None)` when the document parses, but the field is absent.
    ///
    /// # Errors
    ///
    /// - Return [`ObjectError::Field`] if the document cannot be deserialized
    ///   into the minimal structure for the field.
    pub fn field(&self, field: ObjectField) -> Result<Option<String>> {
        let wrap = |source| ObjectError::Field { field, source };
        let value = match field {
            ObjectField::Name => extract::<NameOnly>(&self.content)
                .map_err(wrap)?
                .metadata
                .and_then(|metadata| metadata.name),
            ObjectField::Namespace => extract::<NamespaceOnly>(&self.content)
                .map_err(wrap)?
                .metadata
                .and_then(|metadata| metadata.namespace),
            ObjectField::Kind => extract::<KindOnly>(&self.content).map_err(wrap)?.kind,
            ObjectField::ApiVersion => {
                extract::<ApiVersionOnly>(&self.content)
                    .map_err(wrap)?
                    .api_version
            }
        };

        Ok(value)
    }

    /// Name of object from `.metadata.name`.
    ///
    /// Empty when absent, or when the document cannot be read. Use
    /// [`ObjectYamlEntry::field`] to tell these cases apart.
    pub fn name(&self) -> String {
        self.field_or_empty(ObjectField::Name)
    }

    /// Kind of object from `.kind`.
    pub fn kind(&self) -> String {
        self.field_or_empty(ObjectField::Kind)
    }

    /// API version of object from `.apiVersion`.
    pub fn api_version(&self) -> String {
        self.field_or_empty(ObjectField::ApiVersion)
    }

    /// Namespace of object from `.metadata.namespace`.
    ///
    /// Empty for cluster-scoped objects.
    pub fn namespace(&self) -> String {
        self.field_or_empty(ObjectField::Namespace)
    }

    fn field_or_empty(&self, field: ObjectField) -> String {
        self.field(field).ok().flatten().unwrap_or_default()
    }

    /// Validate object entry.
    ///
    /// A valid entry has content, is valid YAML, and has both a name and a
    /// kind. The namespace may be empty.
    ///
    /// # Errors
    ///
    /// - Return [`ObjectError::ContentNotSet`] if the content is empty.
    /// - Return [`ObjectError::Yaml`] if the content is not valid YAML.
    /// - Return [`ObjectError::MissingName`] if no name can be found.
    /// - Return [`ObjectError::MissingKind`] if no kind can be found.
    pub fn validate(&self) -> Result<()> {
        if self.content.is_empty() {
            return Err(ObjectError::ContentNotSet);
        }

        yaml::validate_yaml(&self.content)?;

        if self.name().is_empty() {
            return Err(ObjectError::MissingName);
        }

        if self.kind().is_empty() {
            return Err(ObjectError::MissingKind);
        }

        Ok(())
    }

    /// Composite key used to order objects.
    pub fn sort_key(&self) -> SortKey {
        SortKey {
            namespace: self.namespace(),
            name: self.name(),
            kind: self.kind(),
        }
    }
}

/// Identifying fields of an object document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectField {
    Name,
    Kind,
    ApiVersion,
    Namespace,
}

impl std::fmt::Display for ObjectField {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.write_str(match self {
            Self::Name => ".metadata.name",
            Self::Kind => ".kind",
            Self::ApiVersion => ".apiVersion",
            Self::Namespace => ".metadata.namespace",
        })
    }
}

#[derive(Debug, Deserialize)]
struct NameOnly {
    metadata: Option<NameMetadata>,
}

#[derive(Debug, Deserialize)]
struct NameMetadata {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NamespaceOnly {
    metadata: Option<NamespaceMetadata>,
}

#[derive(Debug, Deserialize)]
struct NamespaceMetadata {
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
struct KindOnly {
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiVersionOnly {
    #[serde(rename = "apiVersion")]
    api_version: Option<String>,
}

fn extract<T: DeserializeOwned>(content: &str) -> Result<T, serde_yaml::Error> {
    serde_yaml::from_str(content)
}

/// Composite ordering key of an object: namespace, then name, then kind.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub namespace: String,
    pub name: String,
    pub kind: String,
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        alphabetic_cmp(&self.namespace, &other.namespace)
            .then_with(|| alphabetic_cmp(&self.name, &other.name))
            .then_with(|| alphabetic_cmp(&self.kind, &other.kind))
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compare two strings in alphabetic order.
///
/// The empty string comes before any non-empty string. Non-empty strings are
/// compared byte-wise, so digits come before uppercase letters, which come
/// before lowercase letters.
pub fn alphabetic_cmp(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.as_bytes().cmp(b.as_bytes()),
    }
}

/// Check if `a` strictly comes before `b` in alphabetic order.
pub fn is_before_in_alphabet(a: &str, b: &str) -> bool {
    alphabetic_cmp(a, b) == Ordering::Less
}

/// Parse multi-document YAML stream into validated object entries.
///
/// Fails fast: the first invalid document aborts the whole batch.
///
/// # Errors
///
/// - Return [`ObjectError::Document`] naming the position of the first
///   document that fails validation.
#[instrument(skip(input), level = "debug")]
pub fn unmarshal_object_yaml(input: impl AsRef<str>) -> Result<Vec<ObjectYamlEntry>> {
    let mut entries = Vec::new();
    for (index, document) in split_multi_yaml(input).into_iter().enumerate() {
        let entry = ObjectYamlEntry::new(document);
        entry.validate().map_err(|source| ObjectError::Document {
            index,
            source: Box::new(source),
        })?;
        entries.push(entry);
    }

    debug!("unmarshalled {} object documents", entries.len());
    Ok(entries)
}

/// Sort objects of multi-document YAML stream.
///
/// Objects are ordered by (namespace, name, kind), and merged back into a
/// multi-document stream. The result always ends with exactly one line break,
/// so an empty stream sorts to `"\n"`.
///
/// # Errors
///
/// - Return [`ObjectError::Document`] if any document is invalid.
#[instrument(skip(input), level = "debug")]
pub fn sort_objects_yaml(input: impl AsRef<str>) -> Result<String> {
    let mut entries = unmarshal_object_yaml(input)?;
    entries.sort_by_cached_key(ObjectYamlEntry::sort_key);

    let documents = entries
        .iter()
        .map(|entry| entry.content().trim())
        .filter(|content| !content.is_empty())
        .collect::<Vec<_>>();
    let merged = merge_multi_yaml(&documents);

    Ok(format!("{}\n", merged.trim_end()))
}

/// Sort resources of multi-document YAML stream.
///
/// Same as [`sort_objects_yaml`].
pub fn sort_resources_yaml(input: impl AsRef<str>) -> Result<String> {
    sort_objects_yaml(input)
}

/// Object model error types.
#[derive(Debug, thiserror::Error)]
pub enum ObjectError {
    /// Entry has no content at all.
    #[error("Content not set")]
    ContentNotSet,

    /// Object has no `.metadata.name`.
    #[error("Kubernetes object YAML without a name are not valid")]
    MissingName,

    /// Object has no `.kind`.
    #[error("Kubernetes object YAML without a kind are not valid")]
    MissingKind,

    /// Object content is not valid YAML.
    #[error(transparent)]
    Yaml(#[from] YamlError),

    /// Identifying field cannot be deserialized.
    #[error("failed to read {field} of object")]
    Field {
        field: ObjectField,
        #[source]
        source: serde_yaml::Error,
    },

    /// Document of multi-document stream is invalid.
    #[error("invalid object document at position {index}")]
    Document {
        index: usize,
        #[source]
        source: Box<ObjectError>,
    },
}

/// Friendly result alias :3
pub type Result<T, E = ObjectError> = std::result::Result<T, E>;
