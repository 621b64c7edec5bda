use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoordinateError;
use crate::version::Version;

pub const DEFAULT_MODEL_EXTENSION: &str = "zip";

fn check_part(input: &str, part: &str, what: &'static str) -> Result<(), CoordinateError> {
    if part.is_empty() {
        return Err(CoordinateError::InvalidCoordinate {
            input: input.to_owned(),
            reason: what,
        });
    }
    if part.contains(':') || part.chars().any(char::is_whitespace) {
        return Err(CoordinateError::InvalidCoordinate {
            input: input.to_owned(),
            reason: "segments may not contain `:` or whitespace",
        });
    }
    Ok(())
}

/// Logical identity of a dependency: `group:artifact:version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ProjectCoordinate {
    group_id: String,
    artifact_id: String,
    version: String,
}

impl ProjectCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, CoordinateError> {
        let coordinate = Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            version: version.into(),
        };
        let input = coordinate.to_string();
        check_part(&input, &coordinate.group_id, "missing group id")?;
        check_part(&input, &coordinate.artifact_id, "missing artifact id")?;
        check_part(&input, &coordinate.version, "missing version")?;
        Version::parse(&coordinate.version)?;
        Ok(coordinate)
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Always succeeds: construction already validated the version.
    pub fn parsed_version(&self) -> Version {
        Version::parse(&self.version).unwrap_or_else(|_| Version::new(0, 0, 0))
    }
}

impl fmt::Display for ProjectCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group_id, self.artifact_id, self.version)
    }
}

impl FromStr for ProjectCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [group, artifact, version] => Self::new(*group, *artifact, *version),
            _ => Err(CoordinateError::InvalidCoordinate {
                input: s.to_owned(),
                reason: "expected `group:artifact:version`",
            }),
        }
    }
}

impl TryFrom<String> for ProjectCoordinate {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ProjectCoordinate> for String {
    fn from(value: ProjectCoordinate) -> Self {
        value.to_string()
    }
}

/// A model artifact in a Maven-layout repository.
///
/// Parsed from `group:artifact[:extension[:classifier]]:version` and displayed
/// in the full five-part form (the classifier is omitted when empty).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelCoordinate {
    group_id: String,
    artifact_id: String,
    extension: String,
    classifier: String,
    version: String,
}

impl ModelCoordinate {
    pub fn new(
        group_id: impl Into<String>,
        artifact_id: impl Into<String>,
        classifier: impl Into<String>,
        extension: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self, CoordinateError> {
        let coordinate = Self {
            group_id: group_id.into(),
            artifact_id: artifact_id.into(),
            extension: extension.into(),
            classifier: classifier.into(),
            version: version.into(),
        };
        let input = coordinate.to_string();
        check_part(&input, &coordinate.group_id, "missing group id")?;
        check_part(&input, &coordinate.artifact_id, "missing artifact id")?;
        check_part(&input, &coordinate.extension, "missing extension")?;
        check_part(&input, &coordinate.version, "missing version")?;
        if !coordinate.classifier.is_empty() {
            check_part(&input, &coordinate.classifier, "missing classifier")?;
        }
        Version::parse(&coordinate.version)?;
        Ok(coordinate)
    }

    pub fn group_id(&self) -> &str {
        &self.group_id
    }

    pub fn artifact_id(&self) -> &str {
        &self.artifact_id
    }

    pub fn classifier(&self) -> &str {
        &self.classifier
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn parsed_version(&self) -> Version {
        Version::parse(&self.version).unwrap_or_else(|_| Version::new(0, 0, 0))
    }

    /// `org/example/calls-model/1.0/calls-model-1.0-calls.zip`, always `/`-separated.
    pub fn repository_path(&self) -> String {
        let mut path = self.group_id.replace('.', "/");
        path.push('/');
        path.push_str(&self.artifact_id);
        path.push('/');
        path.push_str(&self.version);
        path.push('/');
        path.push_str(&self.artifact_id);
        path.push('-');
        path.push_str(&self.version);
        if !self.classifier.is_empty() {
            path.push('-');
            path.push_str(&self.classifier);
        }
        path.push('.');
        path.push_str(&self.extension);
        path
    }
}

impl fmt::Display for ModelCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:", self.group_id, self.artifact_id, self.extension)?;
        if !self.classifier.is_empty() {
            write!(f, "{}:", self.classifier)?;
        }
        f.write_str(&self.version)
    }
}

impl FromStr for ModelCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split(':').collect::<Vec<_>>().as_slice() {
            [group, artifact, version] => {
                Self::new(*group, *artifact, "", DEFAULT_MODEL_EXTENSION, *version)
            }
            [group, artifact, extension, version] => {
                Self::new(*group, *artifact, "", *extension, *version)
            }
            [group, artifact, extension, classifier, version] => {
                Self::new(*group, *artifact, *classifier, *extension, *version)
            }
            _ => Err(CoordinateError::InvalidCoordinate {
                input: s.to_owned(),
                reason: "expected `group:artifact[:extension[:classifier]]:version`",
            }),
        }
    }
}

impl TryFrom<String> for ModelCoordinate {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ModelCoordinate> for String {
    fn from(value: ModelCoordinate) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_coordinate_parses_and_displays() {
        let pc: ProjectCoordinate = "org.example:lib:1.2.3".parse().unwrap();
        assert_eq!(pc.group_id(), "org.example");
        assert_eq!(pc.artifact_id(), "lib");
        assert_eq!(pc.parsed_version(), Version::new(1, 2, 3));
        assert_eq!(pc.to_string(), "org.example:lib:1.2.3");

        assert!("org.example:lib".parse::<ProjectCoordinate>().is_err());
        assert!("org.example::1.0".parse::<ProjectCoordinate>().is_err());
        assert!("org.example:lib:latest".parse::<ProjectCoordinate>().is_err());
        assert!(ProjectCoordinate::new("org example", "lib", "1.0").is_err());
    }

    #[test]
    fn model_coordinate_short_forms_default_extension() {
        let mc: ModelCoordinate = "org.example:calls-model:1.0".parse().unwrap();
        assert_eq!(mc.extension(), "zip");
        assert_eq!(mc.classifier(), "");
        assert_eq!(mc.to_string(), "org.example:calls-model:zip:1.0");

        let mc: ModelCoordinate = "org.example:calls-model:zip:calls:1.0".parse().unwrap();
        assert_eq!(mc.classifier(), "calls");
        assert_eq!(mc.to_string(), "org.example:calls-model:zip:calls:1.0");
        assert_eq!(mc, mc.to_string().parse().unwrap());
    }

    #[test]
    fn repository_path_follows_maven_layout() {
        let mc: ModelCoordinate = "org.example:calls-model:zip:calls:1.0".parse().unwrap();
        assert_eq!(
            mc.repository_path(),
            "org/example/calls-model/1.0/calls-model-1.0-calls.zip"
        );

        let mc: ModelCoordinate = "org.example:index:json:2.1".parse().unwrap();
        assert_eq!(mc.repository_path(), "org/example/index/2.1/index-2.1.json");
    }

    #[test]
    fn serde_uses_string_form() {
        let pc: ProjectCoordinate = "org.example:lib:1.0".parse().unwrap();
        let json = serde_json::to_string(&pc).unwrap();
        assert_eq!(json, r#""org.example:lib:1.0""#);
        assert_eq!(serde_json::from_str::<ProjectCoordinate>(&json).unwrap(), pc);
        assert!(serde_json::from_str::<ProjectCoordinate>(r#""nope""#).is_err());
    }
}
