use crate::{AcquiredModel, ArchiveError, ModelArchive};

/// Stands in for an archive that is not (yet) available. Always empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullArchive;

impl<M> ModelArchive<M> for NullArchive {
    fn has_model(&self, _key: &str) -> bool {
        false
    }

    fn acquire_model(&self, _key: &str) -> Option<AcquiredModel<M>> {
        None
    }

    fn release_model(&self, model: AcquiredModel<M>) {
        tracing::warn!(
            target: "trove.archive",
            key = %model.key(),
            "model released to the null archive"
        );
    }

    fn outstanding(&self) -> usize {
        0
    }

    fn close(&self) -> Result<(), ArchiveError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_archive_is_always_empty() {
        let archive: &dyn ModelArchive<String> = &NullArchive;
        for key in ["", "java/util/List", "anything at all"] {
            assert!(!archive.has_model(key));
            assert!(archive.acquire_model(key).is_none());
        }
        assert_eq!(archive.outstanding(), 0);
        archive.close().unwrap();
    }
}
