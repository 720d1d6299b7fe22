//! Low-level container I/O: named entries in and out of the three
//! supported encodings.
//!
//! Entries are materialized in memory; archives in this system are bounded
//! by the entity subgraph being moved, not by bulk data (large payloads
//! belong to the blob store, which hands over one payload at a time).

use crate::{ArchiveError, ArchiveFormat, ArchiveResult};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Writes `entries` as a new container at `dest`.
///
/// The container is first written to a sibling temporary file and then
/// atomically renamed over `dest`; a crash mid-write never leaves a
/// half-written archive at the destination.
pub fn write_entries(
    dest: &Path,
    format: ArchiveFormat,
    entries: &[(String, Vec<u8>)],
) -> ArchiveResult<()> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;

    match format {
        ArchiveFormat::Zip | ArchiveFormat::ZipUncompressed => {
            let method = match format {
                ArchiveFormat::Zip => CompressionMethod::Deflated,
                _ => CompressionMethod::Stored,
            };
            let options = SimpleFileOptions::default().compression_method(method);
            let mut zip = ZipWriter::new(tmp.as_file_mut());
            for (name, data) in entries {
                zip.start_file(name.as_str(), options)?;
                zip.write_all(data)?;
            }
            zip.finish()?;
        }
        ArchiveFormat::TarGz => {
            let gz = GzEncoder::new(tmp.as_file_mut(), Compression::default());
            let mut tar = tar::Builder::new(gz);
            for (name, data) in entries {
                let mut header = tar::Header::new_gnu();
                header.set_size(data.len() as u64);
                header.set_mode(0o644);
                header.set_cksum();
                tar.append_data(&mut header, name, data.as_slice())?;
            }
            let gz = tar.into_inner()?;
            gz.finish()?;
        }
    }

    tmp.persist(dest).map_err(|e| ArchiveError::Io(e.error))?;
    Ok(())
}

/// Reads all entries of the container at `path`, detecting the encoding
/// from its magic bytes.
///
/// Container-level damage (unreadable zip directory, truncated gzip
/// stream, unrecognized magic) surfaces as [`ArchiveError::Corrupt`]; a
/// missing file stays a plain I/O error.
pub fn read_entries(path: &Path) -> ArchiveResult<(ArchiveFormat, Vec<(String, Vec<u8>)>)> {
    let mut file = File::open(path)?;
    let mut magic = [0u8; 2];
    let got = file.read(&mut magic)?;
    file.rewind()?;

    if got >= 2 && magic == [0x50, 0x4b] {
        read_zip(file)
    } else if got >= 2 && magic == [0x1f, 0x8b] {
        read_tar_gz(file)
    } else {
        Err(ArchiveError::Corrupt(
            "unrecognized container encoding".into(),
        ))
    }
}

fn read_zip(file: File) -> ArchiveResult<(ArchiveFormat, Vec<(String, Vec<u8>)>)> {
    let mut archive = ZipArchive::new(file)
        .map_err(|e| ArchiveError::Corrupt(format!("unreadable zip container: {e}")))?;
    let mut entries = Vec::new();
    let mut all_stored = true;
    for i in 0..archive.len() {
        let mut entry = archive
            .by_index(i)
            .map_err(|e| ArchiveError::Corrupt(format!("unreadable zip entry: {e}")))?;
        if entry.is_dir() {
            continue;
        }
        if entry.compression() != CompressionMethod::Stored {
            all_stored = false;
        }
        let name = entry.name().to_string();
        let mut data = Vec::with_capacity(entry.size() as usize);
        entry
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::Corrupt(format!("corrupt compressed stream: {e}")))?;
        entries.push((name, data));
    }
    let format = if all_stored && !entries.is_empty() {
        ArchiveFormat::ZipUncompressed
    } else {
        ArchiveFormat::Zip
    };
    Ok((format, entries))
}

fn read_tar_gz(file: File) -> ArchiveResult<(ArchiveFormat, Vec<(String, Vec<u8>)>)> {
    let gz = GzDecoder::new(file);
    let mut tar = tar::Archive::new(gz);
    let mut entries = Vec::new();
    let iter = tar
        .entries()
        .map_err(|e| ArchiveError::Corrupt(format!("unreadable tar container: {e}")))?;
    for entry in iter {
        let mut entry =
            entry.map_err(|e| ArchiveError::Corrupt(format!("corrupt compressed stream: {e}")))?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()
            .map_err(|e| ArchiveError::Corrupt(format!("invalid tar entry path: {e}")))?
            .to_string_lossy()
            .into_owned();
        let mut data = Vec::new();
        entry
            .read_to_end(&mut data)
            .map_err(|e| ArchiveError::Corrupt(format!("corrupt compressed stream: {e}")))?;
        entries.push((name, data));
    }
    Ok((ArchiveFormat::TarGz, entries))
}

/// Extracts every entry of the container at `path` into `dir`.
///
/// Entry names escaping the target directory are rejected.
pub fn extract_to_dir(path: &Path, dir: &Path) -> ArchiveResult<()> {
    let (_, entries) = read_entries(path)?;
    for (name, data) in entries {
        if name.starts_with('/') || name.split('/').any(|part| part == "..") {
            return Err(ArchiveError::Corrupt(format!(
                "entry name escapes extraction directory: {name:?}"
            )));
        }
        let target = dir.join(&name);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &data)?;
    }
    Ok(())
}

/// Packs the contents of `dir` (recursively, entry names relative to
/// `dir`) into a container at `dest`.
pub fn pack_dir(dir: &Path, dest: &Path, format: ArchiveFormat) -> ArchiveResult<()> {
    let mut entries = Vec::new();
    collect_files(dir, String::new(), &mut entries)?;
    // Stable entry order regardless of directory iteration order.
    entries.sort_by(|a, b| a.0.cmp(&b.0));
    write_entries(dest, format, &entries)
}

fn collect_files(
    dir: &Path,
    prefix: String,
    entries: &mut Vec<(String, Vec<u8>)>,
) -> ArchiveResult<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_files(&path, rel, entries)?;
        } else {
            entries.push((rel, std::fs::read(&path)?));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<(String, Vec<u8>)> {
        vec![
            ("metadata.json".to_string(), b"{}".to_vec()),
            ("repo/a/b.txt".to_string(), b"payload".to_vec()),
        ]
    }

    #[test]
    fn roundtrip_all_formats() {
        for format in [
            ArchiveFormat::Zip,
            ArchiveFormat::ZipUncompressed,
            ArchiveFormat::TarGz,
        ] {
            let dir = tempfile::tempdir().unwrap();
            let dest = dir.path().join("out.lineage");
            write_entries(&dest, format, &sample()).unwrap();
            let (detected, entries) = read_entries(&dest).unwrap();
            assert_eq!(detected, format, "{format}");
            assert_eq!(entries, sample(), "{format}");
        }
    }

    #[test]
    fn garbage_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("garbage");
        std::fs::write(&dest, b"this is not an archive").unwrap();
        assert!(matches!(
            read_entries(&dest),
            Err(ArchiveError::Corrupt(_))
        ));
    }

    #[test]
    fn truncated_gzip_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("out.tar.gz");
        write_entries(&dest, ArchiveFormat::TarGz, &sample()).unwrap();
        let bytes = std::fs::read(&dest).unwrap();
        std::fs::write(&dest, &bytes[..bytes.len() / 2]).unwrap();
        assert!(matches!(
            read_entries(&dest),
            Err(ArchiveError::Corrupt(_))
        ));
    }

    #[test]
    fn extract_rejects_escaping_entries() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("evil.lineage");
        let entries = vec![("../escape.txt".to_string(), b"x".to_vec())];
        write_entries(&dest, ArchiveFormat::Zip, &entries).unwrap();
        let out = tempfile::tempdir().unwrap();
        assert!(matches!(
            extract_to_dir(&dest, out.path()),
            Err(ArchiveError::Corrupt(_))
        ));
    }

    #[test]
    fn pack_dir_roundtrip() {
        let src = tempfile::tempdir().unwrap();
        std::fs::write(src.path().join("metadata.json"), b"{}").unwrap();
        std::fs::create_dir_all(src.path().join("repo/a")).unwrap();
        std::fs::write(src.path().join("repo/a/b.txt"), b"payload").unwrap();

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("packed.lineage");
        pack_dir(src.path(), &dest, ArchiveFormat::Zip).unwrap();

        let (_, entries) = read_entries(&dest).unwrap();
        assert_eq!(entries, sample());
    }
}
