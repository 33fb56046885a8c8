//! Branch and commit model types.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

static EMPTY_IDS: LazyLock<HashSet<String>> = LazyLock::new(HashSet::new);

/// The kinds of versioned entities the store manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    /// Terminology concepts.
    Concept,
    /// Stated and inferred relationships.
    Relationship,
    /// OWL axiom reference-set members.
    AxiomMember,
    /// Semantic-index projection rows.
    QueryConcept,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Concept => write!(f, "concept"),
            Self::Relationship => write!(f, "relationship"),
            Self::AxiomMember => write!(f, "axiom-member"),
            Self::QueryConcept => write!(f, "query-concept"),
        }
    }
}

/// A named line of versioned content.
///
/// A non-root branch sees its parent's content as of `base_timepoint`,
/// shadowed by its own entity versions. Parent versions hidden on this
/// branch are listed per entity kind in `versions_replaced`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    /// Slash-separated branch path, e.g. `MAIN/PROJECT-A`.
    pub path: String,
    /// The parent snapshot this branch is based on.
    #[serde(with = "time::serde::rfc3339")]
    pub base_timepoint: OffsetDateTime,
    /// Timepoint of the last successful commit on this branch.
    #[serde(with = "time::serde::rfc3339")]
    pub head_timepoint: OffsetDateTime,
    /// Parent-branch entity versions hidden on this branch, per kind.
    pub versions_replaced: HashMap<EntityKind, HashSet<String>>,
}

impl Branch {
    /// Creates a branch record with empty versions-replaced sets.
    #[must_use]
    pub fn new(path: impl Into<String>, timepoint: OffsetDateTime) -> Self {
        Self {
            path: path.into(),
            base_timepoint: timepoint,
            head_timepoint: timepoint,
            versions_replaced: HashMap::new(),
        }
    }

    /// The parent branch path, or `None` for a root branch.
    #[must_use]
    pub fn parent_path(&self) -> Option<&str> {
        self.path.rsplit_once('/').map(|(parent, _)| parent)
    }

    /// Whether this branch has no parent.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_path().is_none()
    }

    /// The hidden parent-version ids for `kind`.
    #[must_use]
    pub fn versions_replaced(&self, kind: EntityKind) -> &HashSet<String> {
        self.versions_replaced.get(&kind).unwrap_or(&EMPTY_IDS)
    }
}

/// Whether a commit writes content or re-parents the branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommitType {
    /// A regular write of entity versions to the branch.
    Content,
    /// Re-parents the branch onto a newer snapshot of its parent.
    Rebase,
}

/// An atomic write transaction on a branch.
///
/// Staged entity versions carry `start == timepoint`; versions superseded by
/// the commit are ended at the same timepoint. The `branch` field is a
/// snapshot taken when the commit was opened, so `branch.versions_replaced`
/// reflects the pre-commit state even while the commit adds to the live set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Snapshot of the branch at the time the commit was opened.
    pub branch: Branch,
    /// The commit's timepoint; doubles as the version `start` of staged rows.
    #[serde(with = "time::serde::rfc3339")]
    pub timepoint: OffsetDateTime,
    /// Content or rebase.
    pub commit_type: CommitType,
    /// Ids of entity versions deleted within this commit, per kind.
    pub entities_deleted: HashMap<EntityKind, HashSet<String>>,
    /// Operator-facing description carried by the branch lock.
    pub lock_metadata: Option<String>,
}

impl Commit {
    /// Whether this commit re-parents the branch.
    #[must_use]
    pub fn is_rebase(&self) -> bool {
        self.commit_type == CommitType::Rebase
    }

    /// The path of the branch being committed to.
    #[must_use]
    pub fn branch_path(&self) -> &str {
        &self.branch.path
    }

    /// Ids of entity versions deleted within this commit for `kind`.
    #[must_use]
    pub fn entities_deleted(&self, kind: EntityKind) -> &HashSet<String> {
        self.entities_deleted.get(&kind).unwrap_or(&EMPTY_IDS)
    }

    /// Records a deletion staged by this commit.
    pub fn record_deleted(&mut self, kind: EntityKind, id: impl Into<String>) {
        self.entities_deleted.entry(kind).or_default().insert(id.into());
    }
}

/// Selects which entity versions a query sees relative to a commit.
///
/// Backends translate these into their native cursor queries; all four are
/// required by the semantic index pipeline.
#[derive(Debug, Clone)]
pub enum VersionScope {
    /// Content visible on the branch, excluding the open commit's changes.
    VisibleBefore(Commit),
    /// Only versions changed within the open commit: rows started or ended
    /// at the commit timepoint, plus the versions recorded as deleted by
    /// the commit.
    ChangedIn(Commit),
    /// All versions authored on the branch since its base, plus the parent
    /// versions the branch has replaced. Used for rebase replay.
    ChangedOnBranch(Branch),
    /// Content visible on the branch including the open commit's changes.
    VisibleIncluding(Commit),
}

impl VersionScope {
    /// The branch path this scope reads from.
    #[must_use]
    pub fn branch_path(&self) -> &str {
        match self {
            Self::VisibleBefore(commit)
            | Self::ChangedIn(commit)
            | Self::VisibleIncluding(commit) => commit.branch_path(),
            Self::ChangedOnBranch(branch) => &branch.path,
        }
    }
}
