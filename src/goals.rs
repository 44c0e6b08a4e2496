//! Bulk download and upload.
//!
//! These back the `download` and `upload` CLI subcommands.  They work on a
//! connected [`StorageRepository`] and report nothing but their counts;
//! per-object logging happens at debug level.

use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::{StorageError, StorageResult};
use crate::iter::KeyCursor;
use crate::progress::NoProgress;
use crate::repository::StorageRepository;

/// Content type some tools give to zero-byte "directory" objects.
pub const DIRECTORY_CONTENT_TYPE: &str = "application/x-directory";

/// Download artifacts below `path`.
///
/// A single key is downloaded to exactly `path`.  Several keys are treated
/// as prefixes: every object under each of them, in the order given, is
/// saved to `path/<logical path>`.  Directory placeholders are skipped, and
/// so are keys whose path would leave `path` (`..` segments).  Returns the
/// number of files written.
pub fn download<S: AsRef<str>>(
    repository: &StorageRepository,
    keys: &[S],
    path: &Path,
) -> StorageResult<usize> {
    match keys {
        [] => Err(StorageError::invalid("at least one key is required")),
        [key] => {
            repository.get(key.as_ref(), path, &mut NoProgress)?;
            info!("Downloaded {} to {}", key.as_ref(), path.display());
            Ok(1)
        }
        prefixes => {
            let mut downloaded = 0;
            let mut keys = repository.keys_under(prefixes)?;
            while keys.has_next()? {
                let key = keys.next_key()?;
                if is_directory_placeholder(repository, &key)? {
                    debug!("Skipping directory placeholder {}", key);
                    continue;
                }
                let Some(relative) = local_path_for(repository.logical_path_of(&key)) else {
                    warn!("Skipping {}: it does not name a file below {}", key, path.display());
                    continue;
                };
                repository.get_key(&key, &path.join(relative), &mut NoProgress)?;
                downloaded += 1;
            }
            info!("Downloaded {} files to {}", downloaded, path.display());
            Ok(downloaded)
        }
    }
}

fn is_directory_placeholder(repository: &StorageRepository, key: &str) -> StorageResult<bool> {
    if key.ends_with('/') || repository.logical_path_of(key).is_empty() {
        return Ok(true);
    }
    let metadata = repository.metadata_key(key)?;
    Ok(metadata.content_type.as_deref() == Some(DIRECTORY_CONTENT_TYPE))
}

/// Relative local path for a logical path, built from its plain segments.
///
/// Leading slashes are dropped like empty segments.  `None` when a segment
/// would climb out of the download directory or nothing is left.
fn local_path_for(logical: &str) -> Option<PathBuf> {
    let mut relative = PathBuf::new();
    for component in Path::new(logical.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => relative.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

/// Every regular file below `root`, in file-name order, paired with its
/// `/`-separated path relative to `root`.
pub(crate) fn files_below(root: &Path) -> StorageResult<Vec<(PathBuf, String)>> {
    let walk_error = || format!("cannot walk {}", root.display());
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| StorageError::transfer(walk_error(), e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| StorageError::transfer(walk_error(), e))?
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        files.push((entry.into_path(), relative));
    }
    Ok(files)
}

/// Upload a file or a directory tree.
///
/// A file goes to `key`, or to its own file name when no key is given.
/// For a directory every file below it goes to `key/<relative path>`, or
/// to `<relative path>`.  Returns the number of files uploaded.
pub fn upload(
    repository: &StorageRepository,
    path: &Path,
    key: Option<&str>,
) -> StorageResult<usize> {
    if !path.is_dir() {
        let target = match key {
            Some(key) => key.to_string(),
            None => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    StorageError::invalid(format!("{} has no file name", path.display()))
                })?,
        };
        repository.put(path, &target, &mut NoProgress)?;
        info!("Uploaded {} to {}", path.display(), target);
        return Ok(1);
    }

    let files = files_below(path)?;
    for (file, relative) in &files {
        let target = match key {
            Some(key) => format!("{}/{}", key.trim_end_matches('/'), relative),
            None => relative.clone(),
        };
        debug!("Uploading {} to {}", file.display(), target);
        repository.put(file, &target, &mut NoProgress)?;
    }
    info!("Uploaded {} files from {}", files.len(), path.display());
    Ok(files.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositorySettings;
    use crate::storage::memory::{MemoryBackend, MemoryObject};
    use std::sync::Arc;

    fn repository(backend: Arc<MemoryBackend>) -> StorageRepository {
        let settings = RepositorySettings::new("artifacts", "", false).unwrap();
        StorageRepository::with_backend(settings, backend).unwrap()
    }

    #[test]
    fn test_download_requires_a_key() {
        let repo = repository(Arc::new(MemoryBackend::new("artifacts")));
        let dir = tempfile::tempdir().unwrap();
        let err = download::<&str>(&repo, &[], dir.path()).unwrap_err();
        assert_eq!(err.code(), "InvalidConfiguration");
    }

    #[test]
    fn test_download_single_key_to_exact_path() {
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        backend
            .insert("tools/cli.tar.gz", MemoryObject::new("archive"))
            .unwrap();
        let repo = repository(backend);
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("downloaded/cli.tgz");

        assert_eq!(download(&repo, &["tools/cli.tar.gz"], &target).unwrap(), 1);
        assert_eq!(std::fs::read(&target).unwrap(), b"archive");
    }

    #[test]
    fn test_download_prefixes_skips_placeholders() {
        let backend = Arc::new(MemoryBackend::with_page_size("artifacts", 2));
        backend.insert("a/", MemoryObject::new("")).unwrap();
        backend.insert("a/1.txt", MemoryObject::new("one")).unwrap();
        backend
            .insert(
                "a/dir",
                MemoryObject::new("").with_content_type(DIRECTORY_CONTENT_TYPE),
            )
            .unwrap();
        backend.insert("b/x/2.txt", MemoryObject::new("two")).unwrap();
        backend.insert("c/3.txt", MemoryObject::new("three")).unwrap();
        let repo = repository(backend);
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(download(&repo, &["a/", "b/"], dir.path()).unwrap(), 2);
        assert_eq!(std::fs::read(dir.path().join("a/1.txt")).unwrap(), b"one");
        assert_eq!(std::fs::read(dir.path().join("b/x/2.txt")).unwrap(), b"two");
        assert!(!dir.path().join("a/dir").exists());
        assert!(!dir.path().join("c").exists());
    }

    #[test]
    fn test_download_prefixes_stays_inside_target() {
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        backend
            .insert("a/../../escape.txt", MemoryObject::new("outside"))
            .unwrap();
        backend.insert("b/ok.txt", MemoryObject::new("ok")).unwrap();
        let repo = repository(backend);
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        assert_eq!(download(&repo, &["a/", "b/"], &out).unwrap(), 1);
        assert_eq!(std::fs::read(out.join("b/ok.txt")).unwrap(), b"ok");
        assert!(!dir.path().join("escape.txt").exists());
        assert!(!out.join("escape.txt").exists());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_download_prefixes_keeps_leading_slash_keys() {
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        backend.insert("/lead.txt", MemoryObject::new("lead")).unwrap();
        let repo = repository(backend);
        let dir = tempfile::tempdir().unwrap();

        assert_eq!(download(&repo, &["", "zz/"], dir.path()).unwrap(), 1);
        assert_eq!(std::fs::read(dir.path().join("lead.txt")).unwrap(), b"lead");
    }

    #[test]
    fn test_local_path_for() {
        assert_eq!(local_path_for("a/b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(local_path_for("//a/./b.txt"), Some(PathBuf::from("a/b.txt")));
        assert_eq!(local_path_for("a/../../escape.txt"), None);
        assert_eq!(local_path_for(".."), None);
        assert_eq!(local_path_for("/"), None);
    }

    #[test]
    fn test_files_below_uses_slash_paths_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("b/c")).unwrap();
        std::fs::write(dir.path().join("b/c/d.txt"), b"d").unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();

        let files = files_below(dir.path()).unwrap();
        let relative: Vec<&str> = files.iter().map(|(_, r)| r.as_str()).collect();
        assert_eq!(relative, vec!["a.txt", "b/c/d.txt"]);
        assert_eq!(files[1].0, dir.path().join("b/c/d.txt"));
    }

    #[test]
    fn test_upload_single_file_defaults_to_file_name() {
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        let repo = repository(backend.clone());
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("report.html");
        std::fs::write(&file, b"<html/>").unwrap();

        assert_eq!(upload(&repo, &file, None).unwrap(), 1);
        assert!(backend.object("report.html").is_some());

        upload(&repo, &file, Some("reports/latest.html")).unwrap();
        assert!(backend.object("reports/latest.html").is_some());
    }

    #[test]
    fn test_upload_directory() {
        let backend = Arc::new(MemoryBackend::new("artifacts"));
        let repo = repository(backend.clone());
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("index.html"), b"i").unwrap();
        std::fs::write(dir.path().join("css/site.css"), b"c").unwrap();

        assert_eq!(upload(&repo, dir.path(), Some("site/")).unwrap(), 2);
        assert!(backend.object("site/index.html").is_some());
        assert!(backend.object("site/css/site.css").is_some());

        assert_eq!(upload(&repo, dir.path(), None).unwrap(), 2);
        assert!(backend.object("index.html").is_some());
        assert!(backend.object("css/site.css").is_some());
    }

    #[test]
    fn test_upload_missing_file_fails() {
        let repo = repository(Arc::new(MemoryBackend::new("artifacts")));
        let dir = tempfile::tempdir().unwrap();
        let err = upload(&repo, &dir.path().join("absent.txt"), None).unwrap_err();
        assert_eq!(err.code(), "TransferFailure");
    }
}
