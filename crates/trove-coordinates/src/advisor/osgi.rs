use std::collections::HashMap;
use std::sync::OnceLock;

use super::{log_unreadable, open_jar, read_text_entry, CoordinateAdvisor};
use crate::coordinate::ProjectCoordinate;
use crate::dependency::{DependencyInfo, DependencyKind};
use crate::error::CoordinateError;

const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";
const BUNDLE_SYMBOLIC_NAME: &str = "Bundle-SymbolicName";
const BUNDLE_VERSION: &str = "Bundle-Version";

const KNOWN_TOP_LEVEL_DOMAINS: &[&str] = &[
    "at", "au", "be", "biz", "br", "ca", "ch", "cn", "com", "cz", "de", "dk", "edu", "es", "eu",
    "fi", "fr", "gov", "info", "int", "io", "it", "jp", "kr", "mil", "net", "nl", "no", "org",
    "pl", "ru", "se", "uk", "us",
];

/// Derives a coordinate from an OSGi bundle manifest, in a JAR or a project directory.
///
/// The artifact id is the symbolic name. The group id is its first three
/// segments when it starts with a known top-level domain
/// (`org.example.project.test` -> `org.example.project`), otherwise its first
/// segment (`javax.beans` -> `javax`). Only `major.minor.micro` survives from
/// the bundle version.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsgiManifestAdvisor;

impl OsgiManifestAdvisor {
    fn read_manifest(&self, dependency: &DependencyInfo) -> Result<Option<String>, CoordinateError> {
        match dependency.kind {
            DependencyKind::Jar => {
                let mut jar = open_jar(&dependency.location)?;
                read_text_entry(&mut jar, MANIFEST_PATH)
            }
            DependencyKind::Project => {
                match std::fs::read_to_string(dependency.location.join(MANIFEST_PATH)) {
                    Ok(text) => Ok(Some(text)),
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }
}

impl CoordinateAdvisor for OsgiManifestAdvisor {
    fn name(&self) -> &'static str {
        "osgi-manifest"
    }

    fn suggest(&self, dependency: &DependencyInfo) -> Option<ProjectCoordinate> {
        let manifest = match self.read_manifest(dependency) {
            Ok(Some(text)) => text,
            Ok(None) => return None,
            Err(err) => {
                log_unreadable(self.name(), &dependency.location, &err);
                return None;
            }
        };
        coordinate_from_manifest(&manifest)
    }
}

fn coordinate_from_manifest(manifest: &str) -> Option<ProjectCoordinate> {
    let attributes = main_attributes(manifest);
    let name = attributes.get(BUNDLE_SYMBOLIC_NAME)?;
    let version = attributes.get(BUNDLE_VERSION)?;

    let artifact = name.split(';').next().unwrap_or_default().trim();
    let segments: Vec<&str> = artifact.split('.').collect();
    if !segments.iter().all(|segment| is_domain_label(segment)) {
        return None;
    }

    let group_len = if KNOWN_TOP_LEVEL_DOMAINS.contains(&segments[0]) {
        segments.len().min(3)
    } else {
        1
    };
    let group = segments[..group_len].join(".");

    ProjectCoordinate::new(group, artifact, release_version(version)?).ok()
}

fn is_domain_label(segment: &str) -> bool {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| {
        regex::Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?$")
            .expect("domain label regex should compile")
    })
    .is_match(segment)
}

/// `1.0.0.qualifier` -> `1.0.0`; anything but a full OSGi version is rejected.
fn release_version(version: &str) -> Option<String> {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        regex::Regex::new(r"^(\d+\.\d+\.\d+)(?:\.[0-9A-Za-z_-]+)?$")
            .expect("bundle version regex should compile")
    });
    re.captures(version.trim()).map(|caps| caps[1].to_owned())
}

/// Attributes of the main section; continuation lines start with one space.
fn main_attributes(manifest: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    let mut current: Option<(String, String)> = None;
    for line in manifest.lines() {
        if line.trim().is_empty() {
            break;
        }
        if let Some(rest) = line.strip_prefix(' ') {
            if let Some((_, value)) = current.as_mut() {
                value.push_str(rest);
            }
            continue;
        }
        if let Some((key, value)) = current.take() {
            attributes.insert(key, value);
        }
        if let Some((key, value)) = line.split_once(':') {
            current = Some((key.trim().to_owned(), value.trim().to_owned()));
        }
    }
    if let Some((key, value)) = current {
        attributes.insert(key, value);
    }
    attributes
}
