use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use crate::error::CoordinateError;

/// `major.minor.micro[.qualifier]`, ordered field by field.
///
/// Missing numeric parts default to zero; a qualifier may also follow a `-`
/// (`1.2.0-SNAPSHOT`). A release sorts after every qualified build of the same
/// numbers, so `1.2.0-SNAPSHOT < 1.2.0`; qualifiers compare lexically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub micro: u32,
    pub qualifier: String,
}

impl Version {
    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    pub fn parse(input: &str) -> Result<Self, CoordinateError> {
        static RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            regex::Regex::new(r"^(\d+)(?:\.(\d+))?(?:\.(\d+))?(?:[.-]([0-9A-Za-z_][0-9A-Za-z_.-]*))?$")
                .expect("version regex should compile")
        });

        let invalid = || CoordinateError::InvalidVersion {
            input: input.to_owned(),
        };
        let caps = re.captures(input.trim()).ok_or_else(invalid)?;
        let number = |idx: usize| -> Result<u32, CoordinateError> {
            match caps.get(idx) {
                Some(m) => m.as_str().parse().map_err(|_| invalid()),
                None => Ok(0),
            }
        };

        Ok(Self {
            major: number(1)?,
            minor: number(2)?,
            micro: number(3)?,
            qualifier: caps
                .get(4)
                .map(|m| m.as_str().to_owned())
                .unwrap_or_default(),
        })
    }

    pub fn without_qualifier(&self) -> Self {
        Self::new(self.major, self.minor, self.micro)
    }

    /// Pick the candidate nearest to `target`.
    ///
    /// An exact match wins; otherwise the greatest candidate below `target`;
    /// otherwise the smallest candidate above it.
    pub fn find_closest<'a, I>(target: &Version, candidates: I) -> Option<&'a Version>
    where
        I: IntoIterator<Item = &'a Version>,
    {
        let mut below: Option<&Version> = None;
        let mut above: Option<&Version> = None;
        for candidate in candidates {
            match candidate.cmp(target) {
                Ordering::Equal => return Some(candidate),
                Ordering::Less => {
                    if below.map_or(true, |best| candidate > best) {
                        below = Some(candidate);
                    }
                }
                Ordering::Greater => {
                    if above.map_or(true, |best| candidate < best) {
                        above = Some(candidate);
                    }
                }
            }
        }
        below.or(above)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.micro)
            .cmp(&(other.major, other.minor, other.micro))
            .then_with(|| match (self.qualifier.is_empty(), other.qualifier.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.qualifier.cmp(&other.qualifier),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

impl FromStr for Version {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[test]
    fn parses_partial_and_qualified_versions() {
        assert_eq!(v("3"), Version::new(3, 0, 0));
        assert_eq!(v("3.8"), Version::new(3, 8, 0));
        assert_eq!(v("1.0.0.v20140814-1000").qualifier, "v20140814-1000");
        assert_eq!(v("1.2.0-SNAPSHOT").qualifier, "SNAPSHOT");
        assert_eq!(v("1.2.0-SNAPSHOT").without_qualifier(), Version::new(1, 2, 0));
        assert!(Version::parse("").is_err());
        assert!(Version::parse("one.two").is_err());
        assert!(Version::parse("1..2").is_err());
    }

    #[test]
    fn display_normalizes_to_three_parts() {
        assert_eq!(v("4.1").to_string(), "4.1.0");
        assert_eq!(v("4.1.2.qualifier").to_string(), "4.1.2.qualifier");
    }

    #[test]
    fn closest_prefers_exact_then_lower_then_higher() {
        let candidates = vec![v("1.0"), v("2.0"), v("3.0"), v("3.5")];

        assert_eq!(Version::find_closest(&v("2.0"), &candidates), Some(&v("2.0")));
        assert_eq!(Version::find_closest(&v("3.2"), &candidates), Some(&v("3.0")));
        assert_eq!(Version::find_closest(&v("9.0"), &candidates), Some(&v("3.5")));
        assert_eq!(Version::find_closest(&v("0.5"), &candidates), Some(&v("1.0")));
        assert_eq!(Version::find_closest(&v("1.0"), &Vec::new()), None);
    }

    #[test]
    fn releases_sort_after_their_qualified_builds() {
        assert!(v("1.0.0-SNAPSHOT") < v("1.0.0"));
        assert!(v("1.0.0") < v("1.0.1-SNAPSHOT"));
        assert!(v("1.0.0.alpha") < v("1.0.0.beta"));

        let candidates = vec![v("0.9"), v("1.0.0-SNAPSHOT"), v("1.1")];
        assert_eq!(
            Version::find_closest(&v("1.0.0"), &candidates),
            Some(&v("1.0.0-SNAPSHOT"))
        );
        let candidates = vec![v("1.0.0"), v("1.1")];
        assert_eq!(
            Version::find_closest(&v("1.0.0-SNAPSHOT"), &candidates),
            Some(&v("1.0.0"))
        );
    }
}
