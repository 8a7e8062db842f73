//! Epoch, version and release triples

use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

use crate::operator::InvalidOperatorError;

/// Error type for EVR and relation parsing
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvrError {
    #[error("Invalid EVR \"{0}\": version is empty")]
    EmptyVersion(String),
    #[error("Invalid EVR \"{0}\": version has no alphanumeric characters")]
    InvalidVersion(String),
    #[error("Invalid EVR \"{0}\": epoch is not a number")]
    InvalidEpoch(String),
    #[error("Invalid relation \"{0}\"")]
    InvalidRelation(String),
    #[error(transparent)]
    InvalidOperator(#[from] InvalidOperatorError),
}

/// An rpm `epoch:version-release` triple.
///
/// The release is optional so that dependency relations such as `foo >= 1.2` can be
/// compared against full package EVRs: a missing release compares equal to any release.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Evr {
    epoch: u64,
    version: String,
    release: Option<String>,
}

impl Evr {
    pub fn new(epoch: u64, version: impl Into<String>, release: Option<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release,
        }
    }

    /// Parse `[epoch:]version[-release]`.
    ///
    /// The release starts after the last `-`; an absent epoch is 0.
    pub fn parse(input: &str) -> Result<Self, EvrError> {
        let input = input.trim();

        let (epoch, rest) = match input.split_once(':') {
            Some((epoch, rest)) => {
                let epoch = if epoch.is_empty() {
                    0
                } else {
                    epoch
                        .parse::<u64>()
                        .map_err(|_| EvrError::InvalidEpoch(input.to_string()))?
                };
                (epoch, rest)
            }
            None => (0, input),
        };

        let (version, release) = match rest.rsplit_once('-') {
            Some((version, release)) => (version, Some(release.to_string())),
            None => (rest, None),
        };

        if version.is_empty() {
            return Err(EvrError::EmptyVersion(input.to_string()));
        }
        if !version.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(EvrError::InvalidVersion(input.to_string()));
        }

        Ok(Self {
            epoch,
            version: version.to_string(),
            release: release.filter(|r| !r.is_empty()),
        })
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn release(&self) -> Option<&str> {
        self.release.as_deref()
    }

    /// Compare two EVRs the way rpm does.
    ///
    /// Epochs compare numerically, version and release with [`rpmvercmp`]. When either
    /// side has no release the releases are not compared.
    pub fn compare(&self, other: &Evr) -> Ordering {
        match self.epoch.cmp(&other.epoch) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match rpmvercmp(&self.version, &other.version) {
            Ordering::Equal => {}
            ord => return ord,
        }

        match (&self.release, &other.release) {
            (Some(a), Some(b)) => rpmvercmp(a, b),
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for Evr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(release) = &self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for Evr {
    type Err = EvrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Evr::parse(s)
    }
}

/// rpm's version segment comparison.
///
/// Both strings are split into alternating runs of digits and letters; everything else
/// separates segments. Numeric runs compare by value, alphabetic runs lexically and a
/// numeric run is newer than an alphabetic one. `~` sorts before anything, even the end
/// of the string, and `^` sorts after the end of the string but before any other
/// segment.
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let one = a.as_bytes();
    let two = b.as_bytes();
    let (mut i, mut j) = (0usize, 0usize);

    while i < one.len() || j < two.len() {
        while i < one.len() && !is_segment_char(one[i]) {
            i += 1;
        }
        while j < two.len() && !is_segment_char(two[j]) {
            j += 1;
        }

        let c1 = one.get(i).copied();
        let c2 = two.get(j).copied();

        if c1 == Some(b'~') || c2 == Some(b'~') {
            if c1 != Some(b'~') {
                return Ordering::Greater;
            }
            if c2 != Some(b'~') {
                return Ordering::Less;
            }
            i += 1;
            j += 1;
            continue;
        }

        if c1 == Some(b'^') || c2 == Some(b'^') {
            match (c1, c2) {
                (None, _) => return Ordering::Less,
                (_, None) => return Ordering::Greater,
                (Some(x), _) if x != b'^' => return Ordering::Greater,
                (_, Some(y)) if y != b'^' => return Ordering::Less,
                _ => {}
            }
            i += 1;
            j += 1;
            continue;
        }

        if c1.is_none() || c2.is_none() {
            break;
        }

        let (start1, start2) = (i, j);
        let numeric = one[i].is_ascii_digit();
        if numeric {
            while i < one.len() && one[i].is_ascii_digit() {
                i += 1;
            }
            while j < two.len() && two[j].is_ascii_digit() {
                j += 1;
            }
        } else {
            while i < one.len() && one[i].is_ascii_alphabetic() {
                i += 1;
            }
            while j < two.len() && two[j].is_ascii_alphabetic() {
                j += 1;
            }
        }

        let seg1 = &one[start1..i];
        let seg2 = &two[start2..j];

        if seg2.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            let seg1 = trim_leading_zeros(seg1);
            let seg2 = trim_leading_zeros(seg2);
            seg1.len().cmp(&seg2.len()).then_with(|| seg1.cmp(seg2))
        } else {
            seg1.cmp(seg2)
        };

        if ord != Ordering::Equal {
            return ord;
        }
    }

    match (i >= one.len(), j >= two.len()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

#[inline]
fn is_segment_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'~' || c == b'^'
}

fn trim_leading_zeros(segment: &[u8]) -> &[u8] {
    let start = segment
        .iter()
        .position(|&c| c != b'0')
        .unwrap_or(segment.len());
    &segment[start..]
}
