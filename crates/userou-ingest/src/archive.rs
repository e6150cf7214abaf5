//! Registry archive handling
//!
//! The portal publishes one ZIP holding two XML documents, the UO (legal
//! person) export and the FOP (entrepreneur) export. Members are classified by
//! name and streamed to disk so they can be decoded record by record.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use userou_common::checksum::verify_file_checksum;
use userou_common::types::ChecksumAlgorithm;
use zip::ZipArchive;

use crate::error::Result;
use crate::registry::models::{EntityKind, SourceDocument};

/// Members a complete registry archive holds
pub const EXPECTED_MEMBERS: usize = 2;

/// Name fragment marking the legal-person document
const LEGAL_PERSON_MARKER: &str = "UO";

/// Entity kind of an archive member, judged by its name
pub fn classify_member(name: &str) -> EntityKind {
    if name.contains(LEGAL_PERSON_MARKER) {
        EntityKind::LegalPerson
    } else {
        EntityKind::Entrepreneur
    }
}

/// Check the archive against a declared SHA-1
pub fn verify_archive(path: impl AsRef<Path>, expected_sha1: &str) -> Result<()> {
    let path = path.as_ref();
    info!(path = %path.display(), "Verifying archive SHA-1");
    verify_file_checksum(path, expected_sha1, ChecksumAlgorithm::Sha1)?;
    info!("Checksum matches");
    Ok(())
}

/// Documents written to disk by [`extract_documents`]
#[derive(Debug)]
pub struct ExtractedDocuments {
    pub documents: Vec<SourceDocument>,
}

impl ExtractedDocuments {
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.documents.iter().map(|doc| doc.path.as_path())
    }

    /// Remove the extracted files
    pub fn cleanup(self) -> Result<()> {
        for document in self.documents {
            match std::fs::remove_file(&document.path) {
                Ok(()) => debug!(path = %document.path.display(), "Removed extracted document"),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {},
                Err(err) => return Err(err.into()),
            }
        }
        Ok(())
    }
}

/// Extract the members of the requested kinds into `dest`
///
/// Member directories are dropped; each document lands directly in `dest`.
pub fn extract_documents(
    archive_path: impl AsRef<Path>,
    dest: impl AsRef<Path>,
    kinds: &[EntityKind],
) -> Result<ExtractedDocuments> {
    let archive_path = archive_path.as_ref();
    let dest = dest.as_ref();
    std::fs::create_dir_all(dest)?;

    let mut archive = ZipArchive::new(File::open(archive_path)?)?;

    let members = archive.file_names().filter(|name| !name.ends_with('/')).count();
    if members != EXPECTED_MEMBERS {
        warn!(
            path = %archive_path.display(),
            members,
            expected = EXPECTED_MEMBERS,
            "Unexpected number of archive members"
        );
    }

    let mut extracted = ExtractedDocuments {
        documents: Vec::new(),
    };
    if let Err(err) = extract_members(&mut archive, dest, kinds, &mut extracted.documents) {
        if let Err(cleanup_err) = extracted.cleanup() {
            warn!(error = %cleanup_err, "Failed to remove partially extracted documents");
        }
        return Err(err);
    }

    Ok(extracted)
}

/// Stream matching members to `dest`, recording each target as soon as it exists
fn extract_members(
    archive: &mut ZipArchive<File>,
    dest: &Path,
    kinds: &[EntityKind],
    documents: &mut Vec<SourceDocument>,
) -> Result<()> {
    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        if member.is_dir() {
            continue;
        }

        let Some(file_name) = member
            .enclosed_name()
            .and_then(|p| p.file_name().map(PathBuf::from))
        else {
            warn!(name = member.name(), "Skipping archive member with unsafe path");
            continue;
        };

        let kind = classify_member(member.name());
        if !kinds.contains(&kind) {
            debug!(name = member.name(), %kind, "Skipping member, entity kind not requested");
            continue;
        }

        let target = dest.join(&file_name);
        info!(name = member.name(), %kind, target = %target.display(), "Extracting");

        let file = File::create(&target)?;
        documents.push(SourceDocument::new(&target, kind));

        let mut out = BufWriter::new(file);
        let bytes = std::io::copy(&mut member, &mut out)?;
        out.flush()?;
        debug!(bytes, "Extracted member");
    }

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    const UO_MEMBER: &str = "17.1-EX_XML_EDR_UO_FULL_07.11.2018.xml";
    const FOP_MEMBER: &str = "17.2-EX_XML_EDR_FOP_FULL_07.11.2018.xml";

    fn write_archive(path: &Path, members: &[(&str, &str)]) {
        let mut zip = ZipWriter::new(File::create(path).unwrap());
        for (name, body) in members {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_classify_member() {
        assert_eq!(classify_member(UO_MEMBER), EntityKind::LegalPerson);
        assert_eq!(classify_member(FOP_MEMBER), EntityKind::Entrepreneur);
        assert_eq!(classify_member("readme.txt"), EntityKind::Entrepreneur);
    }

    #[test]
    fn test_extract_requested_kinds_only() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("edr.zip");
        write_archive(&archive, &[(UO_MEMBER, "<DATA/>"), (FOP_MEMBER, "<DATA/>")]);

        let out = dir.path().join("out");
        let extracted = extract_documents(&archive, &out, &[EntityKind::LegalPerson]).unwrap();

        assert_eq!(extracted.documents.len(), 1);
        assert_eq!(extracted.documents[0].kind, EntityKind::LegalPerson);
        assert_eq!(extracted.documents[0].path, out.join(UO_MEMBER));
        assert!(!out.join(FOP_MEMBER).exists());
    }

    #[test]
    fn test_extract_both_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("edr.zip");
        write_archive(
            &archive,
            &[
                (format!("edr/{}", FOP_MEMBER).as_str(), "<DATA/>"),
                (UO_MEMBER, "<DATA><RECORD/></DATA>"),
            ],
        );

        let extracted = extract_documents(
            &archive,
            dir.path(),
            &[EntityKind::LegalPerson, EntityKind::Entrepreneur],
        )
        .unwrap();

        let paths: Vec<PathBuf> = extracted.paths().map(Path::to_path_buf).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths.iter().all(|p| p.exists()));
        assert_eq!(
            std::fs::read_to_string(dir.path().join(UO_MEMBER)).unwrap(),
            "<DATA><RECORD/></DATA>"
        );

        extracted.cleanup().unwrap();
        assert!(paths.iter().all(|p| !p.exists()));
        assert!(archive.exists());
    }

    #[test]
    fn test_failed_member_removes_earlier_extractions() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("edr.zip");
        write_archive(&archive, &[(UO_MEMBER, "<DATA/>"), (FOP_MEMBER, "<DATA/>")]);

        // A directory in the way of the second target makes its creation fail
        let out = dir.path().join("out");
        std::fs::create_dir_all(out.join(FOP_MEMBER)).unwrap();

        let err = extract_documents(
            &archive,
            &out,
            &[EntityKind::LegalPerson, EntityKind::Entrepreneur],
        )
        .unwrap_err();

        assert!(matches!(err, crate::error::IngestError::Io(_)));
        assert!(!out.join(UO_MEMBER).exists());
        assert!(out.join(FOP_MEMBER).is_dir());
    }

    #[test]
    fn test_unexpected_member_count_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("edr.zip");
        write_archive(&archive, &[(UO_MEMBER, "<DATA/>")]);

        let extracted = extract_documents(&archive, dir.path(), &[EntityKind::LegalPerson]).unwrap();
        assert_eq!(extracted.documents.len(), 1);
    }

    #[test]
    fn test_verify_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edr.zip");
        std::fs::write(&path, "hello world").unwrap();

        verify_archive(&path, "2AAE6C35C94FCFB415DBE95F408B9CE91EE846ED").unwrap();
        assert!(verify_archive(&path, "0000").is_err());
    }

    #[test]
    fn test_not_a_zip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("edr.zip");
        std::fs::write(&path, "not a zip").unwrap();

        let err = extract_documents(&path, dir.path(), &[EntityKind::LegalPerson]).unwrap_err();
        assert!(matches!(err, crate::error::IngestError::Archive(_)));
    }
}
