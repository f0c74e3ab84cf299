//! Selection vectors
//!
//! A selection vector holds one [`Facet`] per dimension of a word key. The
//! word is dimension 0, the POS fields follow in order.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::models::WordKey;

/// Filter/group state of a single dimension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facet {
    /// Only rows whose field equals the value.
    Concrete(String),
    /// No filter; the dimension stays in the grouping.
    Any,
    /// No filter; the dimension is collapsed out of the grouping.
    Aggregate,
}

impl Facet {
    pub fn concrete(value: impl Into<String>) -> Self {
        Facet::Concrete(value.into())
    }

    pub fn is_grouped(&self) -> bool {
        !matches!(self, Facet::Aggregate)
    }

    pub fn value(&self) -> Option<&str> {
        match self {
            Facet::Concrete(v) => Some(v),
            _ => None,
        }
    }
}

/// Parses the command line form: `*` is Any, `#` is Aggregate, a leading
/// backslash escapes a literal value.
impl FromStr for Facet {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "*" => Facet::Any,
            "#" => Facet::Aggregate,
            _ => match s.strip_prefix('\\') {
                Some(rest) => Facet::Concrete(rest.to_string()),
                None => Facet::Concrete(s.to_string()),
            },
        })
    }
}

impl fmt::Display for Facet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Facet::Any => f.write_str("*"),
            Facet::Aggregate => f.write_str("#"),
            Facet::Concrete(v) if v == "*" || v == "#" || v.starts_with('\\') => {
                write!(f, "\\{v}")
            }
            Facet::Concrete(v) => f.write_str(v),
        }
    }
}

/// Per-dimension filter and grouping specification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionVector {
    facets: Vec<Facet>,
}

impl SelectionVector {
    /// Every dimension `Any`: unfiltered, fully grouped.
    pub fn any(dimensions: usize) -> Self {
        Self {
            facets: vec![Facet::Any; dimensions],
        }
    }

    /// Every dimension `Aggregate`: a single grand total.
    pub fn aggregate_all(dimensions: usize) -> Self {
        Self {
            facets: vec![Facet::Aggregate; dimensions],
        }
    }

    /// Every dimension fixed to the key's values.
    pub fn for_key(key: &WordKey) -> Self {
        Self {
            facets: key.values().map(Facet::concrete).collect(),
        }
    }

    /// Builds a selection from command line arguments, padding missing
    /// trailing dimensions with `Any`.
    pub fn from_args<S: AsRef<str>>(args: &[S], dimensions: usize) -> Self {
        let mut selection = Self::any(dimensions);
        for (i, arg) in args.iter().enumerate() {
            // FromStr for Facet is infallible
            let facet = arg.as_ref().parse().unwrap_or(Facet::Any);
            if i < dimensions {
                selection.facets[i] = facet;
            } else {
                selection.facets.push(facet);
            }
        }
        selection
    }

    /// Replaces the facet of `dimension`. Out-of-range indexes are ignored
    /// here and rejected by the store.
    pub fn with(mut self, dimension: usize, facet: Facet) -> Self {
        self.set(dimension, facet);
        self
    }

    pub fn set(&mut self, dimension: usize, facet: Facet) {
        if let Some(slot) = self.facets.get_mut(dimension) {
            *slot = facet;
        }
    }

    pub fn get(&self, dimension: usize) -> Option<&Facet> {
        self.facets.get(dimension)
    }

    pub fn len(&self) -> usize {
        self.facets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.facets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Facet> {
        self.facets.iter()
    }

    /// Indexes of dimensions that stay in the grouping.
    pub fn grouped_dimensions(&self) -> Vec<usize> {
        self.facets
            .iter()
            .enumerate()
            .filter(|(_, f)| f.is_grouped())
            .map(|(i, _)| i)
            .collect()
    }
}

impl From<Vec<Facet>> for SelectionVector {
    fn from(facets: Vec<Facet>) -> Self {
        Self { facets }
    }
}

impl fmt::Display for SelectionVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.facets.iter().map(ToString::to_string).collect();
        f.write_str(&parts.join(" "))
    }
}
