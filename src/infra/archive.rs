//! Source archive extraction
//!
//! Archives are unpacked as-is into the destination directory, keeping their
//! top-level folder. Formats without a pure Rust decoder in the dependency
//! tree are handed to the system `tar`.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use flate2::read::GzDecoder;
use tar::Archive;

use crate::error::ArchiveError;
use crate::infra::process::ProcessCommand;

/// Archive formats recognised by file name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Zip,
    TarGz,
    Tar,
    /// Compressed tarball unpacked by the system `tar` (bz2, xz, ...)
    SystemTar,
}

impl ArchiveKind {
    /// Determine the format from the archive's file name
    pub fn from_path(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".zip") {
            Self::Zip
        } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            Self::TarGz
        } else if name.ends_with(".tar") {
            Self::Tar
        } else {
            Self::SystemTar
        }
    }
}

/// Extract `archive` into `dest`
pub fn extract(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    if !archive.is_file() {
        return Err(ArchiveError::NotFound {
            path: archive.to_path_buf(),
        });
    }
    let extract_error = |error: String| ArchiveError::Extract {
        path: archive.to_path_buf(),
        error,
    };
    std::fs::create_dir_all(dest).map_err(|e| extract_error(e.to_string()))?;

    tracing::info!("Extracting archive \"{}\"", archive.display());
    let open = || File::open(archive).map_err(|e| extract_error(e.to_string()));

    match ArchiveKind::from_path(archive) {
        ArchiveKind::Zip => {
            let mut zip = zip::ZipArchive::new(BufReader::new(open()?))
                .map_err(|e| extract_error(e.to_string()))?;
            zip.extract(dest).map_err(|e| extract_error(e.to_string()))
        }
        ArchiveKind::TarGz => Archive::new(GzDecoder::new(BufReader::new(open()?)))
            .unpack(dest)
            .map_err(|e| extract_error(e.to_string())),
        ArchiveKind::Tar => Archive::new(BufReader::new(open()?))
            .unpack(dest)
            .map_err(|e| extract_error(e.to_string())),
        ArchiveKind::SystemTar => {
            let archive = std::path::absolute(archive).map_err(|e| extract_error(e.to_string()))?;
            ProcessCommand::new("tar")
                .arg("-xf")
                .arg(archive.display().to_string())
                .current_dir(dest)
                .run()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write_tar_gz(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, content) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }

    #[test]
    fn test_kind_from_path() {
        assert_eq!(ArchiveKind::from_path(Path::new("icu4c-64_2-src.zip")), ArchiveKind::Zip);
        assert_eq!(ArchiveKind::from_path(Path::new("zlib-1.2.11.tar.gz")), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::from_path(Path::new("jpeg.TGZ")), ArchiveKind::TarGz);
        assert_eq!(ArchiveKind::from_path(Path::new("a.tar")), ArchiveKind::Tar);
        assert_eq!(
            ArchiveKind::from_path(Path::new("boost_1_71_0.tar.bz2")),
            ArchiveKind::SystemTar
        );
    }

    #[test]
    fn test_missing_archive() {
        let temp = TempDir::new().unwrap();
        let result = extract(&temp.path().join("nope.tar.gz"), temp.path());
        assert!(matches!(result, Err(ArchiveError::NotFound { .. })));
    }

    #[test]
    fn test_extract_tar_gz_keeps_top_folder() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("zlib-1.2.11.tar.gz");
        write_tar_gz(
            &archive,
            &[("zlib-1.2.11/zlib.h", "header"), ("zlib-1.2.11/README", "readme")],
        );

        let dest = temp.path().join("work");
        extract(&archive, &dest).unwrap();
        assert_eq!(
            std::fs::read_to_string(dest.join("zlib-1.2.11/zlib.h")).unwrap(),
            "header"
        );
    }

    #[test]
    fn test_extract_zip() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("icu.zip");
        {
            let file = File::create(&archive).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer
                .start_file("icu/source/readme.txt", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(b"icu").unwrap();
            writer.finish().unwrap();
        }

        let dest = temp.path().join("work");
        extract(&archive, &dest).unwrap();
        assert_eq!(
            std::fs::read_to_string(dest.join("icu/source/readme.txt")).unwrap(),
            "icu"
        );
    }

    #[test]
    fn test_corrupt_archive_is_extract_error() {
        let temp = TempDir::new().unwrap();
        let archive = temp.path().join("broken.zip");
        std::fs::write(&archive, b"not a zip").unwrap();
        let result = extract(&archive, &temp.path().join("work"));
        assert!(matches!(result, Err(ArchiveError::Extract { .. })));
    }
}
