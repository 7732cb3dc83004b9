//! PNG persistence of captured images.

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageFormat;
use tracing::info;
use uuid::Uuid;

use screencap_platform::filesystem::FileSystem;

use crate::error::PersistenceError;
use crate::raster::CapturedImage;

/// The local disk. Writes go to a temp file beside the target and are renamed into place.
pub struct LocalFileSystem;

impl FileSystem for LocalFileSystem {
    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory {}", path.display()))
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<()> {
        let dir = path
            .parent()
            .with_context(|| format!("{} has no parent directory", path.display()))?;
        let name = path
            .file_name()
            .with_context(|| format!("{} has no file name", path.display()))?;
        let tmp = dir.join(format!(
            ".{}.{}.tmp",
            name.to_string_lossy(),
            Uuid::new_v4().simple()
        ));

        let result = write_then_rename(&tmp, path, data);
        if result.is_err() {
            let _ = fs::remove_file(&tmp);
        }
        result
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).with_context(|| format!("failed to resolve {}", path.display()))
    }
}

fn write_then_rename(tmp: &Path, path: &Path, data: &[u8]) -> Result<()> {
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(tmp)
        .with_context(|| format!("failed to create {}", tmp.display()))?;
    file.write_all(data)
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    file.sync_all()
        .with_context(|| format!("failed to sync {}", tmp.display()))?;
    drop(file);

    fs::rename(tmp, path)
        .with_context(|| format!("failed to move {} into place", tmp.display()))
}

/// Encode an image as a standard PNG.
pub fn encode_png(image: &CapturedImage) -> Result<Vec<u8>, PersistenceError> {
    let mut png = Vec::new();
    image
        .pixels()
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}

/// Save `image` as `filename` under `directory` on the local disk, creating the directory if
/// needed. Returns the absolute path of the written file.
pub fn persist_image(
    image: &CapturedImage,
    filename: &str,
    directory: impl AsRef<Path>,
) -> Result<PathBuf, PersistenceError> {
    persist_image_with(&LocalFileSystem, image, filename, directory.as_ref())
}

/// [`persist_image`] through an arbitrary filesystem.
pub fn persist_image_with(
    fs: &dyn FileSystem,
    image: &CapturedImage,
    filename: &str,
    directory: &Path,
) -> Result<PathBuf, PersistenceError> {
    if !is_plain_file_name(filename) {
        return Err(PersistenceError::InvalidFilename(filename.to_string()));
    }

    let png = encode_png(image)?;

    fs.create_dir_all(directory)
        .map_err(|source| PersistenceError::CreateDir {
            path: directory.to_path_buf(),
            source,
        })?;
    let directory = fs
        .canonicalize(directory)
        .map_err(|source| PersistenceError::CreateDir {
            path: directory.to_path_buf(),
            source,
        })?;

    let path = directory.join(filename);
    fs.write_atomic(&path, &png)
        .map_err(|source| PersistenceError::Write {
            path: path.clone(),
            source,
        })?;

    info!(
        "saved {}x{} screenshot to {} ({} bytes)",
        image.width(),
        image.height(),
        path.display(),
        png.len()
    );
    Ok(path)
}

/// A single normal path component: no separators, no `.`/`..`, not empty.
fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == name
    )
}

#[cfg(test)]
mod tests {
    use image::{Rgba, RgbaImage};
    use screencap_platform::screen::Orientation;
    use tempfile::TempDir;

    use super::*;
    use crate::testing::FullDisk;

    fn sample_image(width: u32, height: u32) -> CapturedImage {
        let pixels = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, 200, 255])
        });
        CapturedImage::new(pixels, 1, Orientation::Portrait)
    }

    #[test]
    fn test_persist_creates_missing_directories() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("new_dir").join("nested");
        let img = sample_image(7, 5);

        let path = persist_image(&img, "shot.png", &dir).unwrap();

        assert!(path.is_absolute());
        assert!(path.ends_with("new_dir/nested/shot.png"));
        let decoded = image::open(&path).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (7, 5));
        assert_eq!(&decoded, img.pixels());
    }

    #[test]
    fn test_persist_overwrites_existing_file() {
        let tmp = TempDir::new().unwrap();
        persist_image(&sample_image(2, 2), "shot.png", tmp.path()).unwrap();
        let path = persist_image(&sample_image(3, 4), "shot.png", tmp.path()).unwrap();

        let decoded = image::open(&path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (3, 4));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_persist_resolves_relative_directory() {
        let tmp = TempDir::new().unwrap();
        let path = persist_image(
            &sample_image(1, 1),
            "a.png",
            tmp.path().join("x").join("..").join("y"),
        )
        .unwrap();
        assert_eq!(path, fs::canonicalize(tmp.path()).unwrap().join("y").join("a.png"));
    }

    #[test]
    fn test_invalid_file_names_are_rejected() {
        let tmp = TempDir::new().unwrap();
        for name in ["", ".", "..", "a/b.png", "../escape.png"] {
            let err = persist_image(&sample_image(1, 1), name, tmp.path()).unwrap_err();
            assert!(matches!(err, PersistenceError::InvalidFilename(_)), "{name:?}");
        }
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_directory_creation_failure() {
        let tmp = TempDir::new().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, b"not a directory").unwrap();

        let err = persist_image(&sample_image(1, 1), "shot.png", blocker.join("sub")).unwrap_err();
        assert!(matches!(err, PersistenceError::CreateDir { .. }));
    }

    #[test]
    fn test_write_failure_leaves_nothing_behind() {
        let tmp = TempDir::new().unwrap();
        let err = persist_image_with(&FullDisk, &sample_image(4, 4), "shot.png", tmp.path())
            .unwrap_err();
        assert!(matches!(err, PersistenceError::Write { .. }));
        assert!(err.to_string().contains("no space left"));
        assert_eq!(fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        // a directory in the way makes the final rename fail
        fs::create_dir(tmp.path().join("shot.png")).unwrap();
        fs::write(tmp.path().join("shot.png").join("keep"), b"x").unwrap();

        let err = LocalFileSystem
            .write_atomic(&tmp.path().join("shot.png"), b"data")
            .unwrap_err();
        assert!(err.to_string().contains("into place"));
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("shot.png")]);
    }

    #[test]
    fn test_encode_png_signature() {
        let png = encode_png(&sample_image(2, 2)).unwrap();
        assert_eq!(&png[0..8], &[137, 80, 78, 71, 13, 10, 26, 10]);
    }
}
