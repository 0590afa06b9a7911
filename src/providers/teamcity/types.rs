use std::fmt;

use serde::{Deserialize, Serialize};

/// One unit of work requested from the detail endpoint.
///
/// The listing endpoint reports either `(buildId, testId)` pairs (the first
/// failing build of an investigated test) or bare build ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Pair {
        #[serde(rename = "buildId")]
        build_id: u64,
        #[serde(rename = "testId")]
        test_id: u64,
    },
    Build(u64),
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pair { build_id, test_id } => write!(f, "{build_id}_{test_id}"),
            Self::Build(build_id) => write!(f, "{build_id}"),
        }
    }
}

/// Renders identifiers as the comma-joined `ids` request parameter.
pub fn join_identifiers(identifiers: &[Identifier]) -> String {
    identifiers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// A single page returned by the listing endpoint.
///
/// Older plugin versions answer with a bare array and never paginate.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IdsPage {
    Paged {
        items: Vec<Identifier>,
        #[serde(rename = "nextHref", default)]
        next_href: Option<String>,
    },
    Single(Vec<Identifier>),
}

impl IdsPage {
    pub fn into_parts(self) -> (Vec<Identifier>, Option<String>) {
        match self {
            Self::Paged { items, next_href } => {
                let next_href = next_href.filter(|href| !href.trim().is_empty());
                (items, next_href)
            }
            Self::Single(items) => (items, None),
        }
    }
}
