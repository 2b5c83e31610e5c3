// Core domain types shared across all ghtasks crates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::task::tags::TagSet;

/// Whether a tracked item is an issue or a pull request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Issue,
    PullRequest,
}

impl TaskKind {
    /// Text rendered between the checkbox and the link.
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Issue => "",
            Self::PullRequest => "PR: ",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Open,
    Closed,
}

impl TaskStatus {
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Character between the checkbox brackets.
    pub const fn glyph(self) -> char {
        match self {
            Self::Open => ' ',
            Self::Closed => 'x',
        }
    }
}

/// One tracked item as it appears (or will appear) in the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    /// Tracker-assigned id; the join key between local and remote records.
    pub identity: u64,
    pub kind: TaskKind,
    pub title: String,
    pub url: String,
    /// `owner/name`.
    pub repository_ref: String,
    /// Tracker-local number, e.g. `123` for `owner/name#123`.
    pub sequence_number: u64,
    pub status: TaskStatus,
    #[serde(default)]
    pub tags: TagSet,
    pub created_at: Option<NaiveDate>,
    pub closed_at: Option<NaiveDate>,
    /// Exact text of the line this record was decoded from. `None` for
    /// records built from remote items.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_line: Option<String>,
}

/// A tracker entity as fetched, before it is merged into the document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteItem {
    pub identity: u64,
    pub kind: TaskKind,
    pub title: String,
    pub url: String,
    pub repository_ref: String,
    pub sequence_number: u64,
    pub status: TaskStatus,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub closed_at: Option<DateTime<Utc>>,
}

/// A category of tracked items, each owning one section of the document.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AssignedIssues,
    AssignedPullRequests,
    OpenedPullRequests,
    ReviewRequestedPullRequests,
    AuthoredIssues,
}

impl Category {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AssignedIssues => "assigned_issues",
            Self::AssignedPullRequests => "assigned_pull_requests",
            Self::OpenedPullRequests => "opened_pull_requests",
            Self::ReviewRequestedPullRequests => "review_requested_pull_requests",
            Self::AuthoredIssues => "authored_issues",
        }
    }

    pub const fn default_header(self) -> &'static str {
        match self {
            Self::AssignedIssues => "## Issues assigned to me",
            Self::AssignedPullRequests => "## PRs assigned to me",
            Self::OpenedPullRequests => "## PRs opened by me",
            Self::ReviewRequestedPullRequests => "## PRs awaiting my review",
            Self::AuthoredIssues => "## Issues opened by me",
        }
    }

    pub const fn kind(self) -> TaskKind {
        match self {
            Self::AssignedIssues | Self::AuthoredIssues => TaskKind::Issue,
            Self::AssignedPullRequests
            | Self::OpenedPullRequests
            | Self::ReviewRequestedPullRequests => TaskKind::PullRequest,
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One managed section: which category it holds and the heading that marks it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SectionSpec {
    pub category: Category,
    pub header: String,
    pub kind: TaskKind,
}

impl SectionSpec {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            header: category.default_header().to_string(),
            kind: category.kind(),
        }
    }

    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.header = header.into();
        self
    }
}

/// The managed sections, in document-assembly order, used when nothing is configured.
pub fn default_sections() -> Vec<SectionSpec> {
    vec![
        SectionSpec::new(Category::AssignedIssues),
        SectionSpec::new(Category::AssignedPullRequests),
        SectionSpec::new(Category::OpenedPullRequests),
    ]
}
