use std::collections::HashMap;
use std::sync::OnceLock;

use super::{log_unreadable, open_jar, read_text_entry, CoordinateAdvisor};
use crate::coordinate::ProjectCoordinate;
use crate::dependency::{DependencyInfo, DependencyKind};
use crate::error::CoordinateError;

/// Reads `META-INF/maven/<group>/<artifact>/pom.properties` from a JAR.
///
/// The properties must agree with the directory they live in, and the JAR
/// must contain exactly one such file; shaded JARs that embed several are
/// ambiguous and get no suggestion.
#[derive(Debug, Clone, Copy, Default)]
pub struct MavenPomPropertiesAdvisor;

impl MavenPomPropertiesAdvisor {
    fn scan(&self, dependency: &DependencyInfo) -> Result<Option<ProjectCoordinate>, CoordinateError> {
        static RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = RE.get_or_init(|| {
            regex::Regex::new(r"^META-INF/maven/([^/]+)/([^/]+)/pom\.properties$")
                .expect("pom.properties regex should compile")
        });

        let mut jar = open_jar(&dependency.location)?;
        let candidates: Vec<(String, String, String)> = jar
            .file_names()
            .filter_map(|name| {
                let caps = re.captures(name)?;
                Some((name.to_owned(), caps[1].to_owned(), caps[2].to_owned()))
            })
            .collect();

        let mut found = Vec::new();
        for (entry, dir_group, dir_artifact) in candidates {
            let Some(text) = read_text_entry(&mut jar, &entry)? else {
                continue;
            };
            let props = parse_properties(&text);
            let (Some(group), Some(artifact), Some(version)) = (
                props.get("groupId"),
                props.get("artifactId"),
                props.get("version"),
            ) else {
                continue;
            };
            if *group != dir_group || *artifact != dir_artifact {
                continue;
            }
            if let Ok(coordinate) = ProjectCoordinate::new(group, artifact, version) {
                found.push(coordinate);
            }
        }

        if found.len() == 1 {
            Ok(found.pop())
        } else {
            Ok(None)
        }
    }
}

impl CoordinateAdvisor for MavenPomPropertiesAdvisor {
    fn name(&self) -> &'static str {
        "maven-pom-properties"
    }

    fn is_applicable(&self, kind: DependencyKind) -> bool {
        kind == DependencyKind::Jar
    }

    fn suggest(&self, dependency: &DependencyInfo) -> Option<ProjectCoordinate> {
        if !self.is_applicable(dependency.kind) {
            return None;
        }
        match self.scan(dependency) {
            Ok(coordinate) => coordinate,
            Err(err) => {
                log_unreadable(self.name(), &dependency.location, &err);
                None
            }
        }
    }
}

/// Minimal `java.util.Properties` reader: `key=value` or `key: value`, `#`/`!` comments.
fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            Some((
                line[..split].trim().to_owned(),
                line[split + 1..].trim().to_owned(),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_skip_comments_and_accept_both_separators() {
        let props = parse_properties(
            "#Generated by Maven\n#Tue Jan 01 00:00:00 UTC 2013\nversion=1.0.0\ngroupId = org.example\nartifactId: example\n",
        );
        assert_eq!(props.get("version").map(String::as_str), Some("1.0.0"));
        assert_eq!(props.get("groupId").map(String::as_str), Some("org.example"));
        assert_eq!(props.get("artifactId").map(String::as_str), Some("example"));
        assert_eq!(props.len(), 3);
    }
}
