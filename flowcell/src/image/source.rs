//! Image-loading collaborator and per-channel file lists.

use std::path::{Path, PathBuf};

use hashbrown::HashMap;

use crate::common::Buffer2;
use crate::error::{Error, Result};

/// Maximum number of fluorescence channels (A/C/G/T).
pub const MAX_CHANNELS: usize = 4;

/// Decodes one image file into 16-bit pixels.
///
/// Pixel decoding (TIFF or otherwise) lives outside this crate.
pub trait ImageSource: Sync {
    fn load(&self, path: &Path) -> Result<Buffer2<u16>>;
}

/// In-memory image store keyed by path.
#[derive(Debug, Default)]
pub struct MemoryImageSource {
    images: HashMap<PathBuf, Buffer2<u16>>,
}

impl MemoryImageSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, image: Buffer2<u16>) {
        self.images.insert(path.into(), image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ImageSource for MemoryImageSource {
    fn load(&self, path: &Path) -> Result<Buffer2<u16>> {
        self.images.get(path).cloned().ok_or_else(|| Error::ImageLoad {
            path: path.to_path_buf(),
            reason: "no such image".to_string(),
        })
    }
}

/// Cycle-ordered image paths, one list per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLists {
    channels: Vec<Vec<PathBuf>>,
}

impl FileLists {
    /// Validate and wrap per-channel path lists.
    ///
    /// Every channel must list at least one cycle and all channels must list
    /// the same number of cycles.
    pub fn new(channels: Vec<Vec<PathBuf>>) -> Result<Self> {
        assert!(
            (1..=MAX_CHANNELS).contains(&channels.len()),
            "expected 1..={} channels, got {}",
            MAX_CHANNELS,
            channels.len()
        );

        if let Some(channel) = channels.iter().position(Vec::is_empty) {
            return Err(Error::EmptyFileList { channel });
        }

        let expected = channels[0].len();
        if let Some((channel, list)) = channels
            .iter()
            .enumerate()
            .find(|(_, list)| list.len() != expected)
        {
            return Err(Error::ChannelLengthMismatch {
                channel,
                expected,
                actual: list.len(),
            });
        }

        Ok(Self { channels })
    }

    /// Read one list file per channel: one image path per line, blank lines
    /// and `#` comments skipped. Relative paths resolve against the list
    /// file's directory.
    pub fn from_list_files<P: AsRef<Path>>(list_files: &[P]) -> Result<Self> {
        let channels = list_files
            .iter()
            .map(|list| read_list_file(list.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(channels)
    }

    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    pub fn num_cycles(&self) -> usize {
        self.channels[0].len()
    }

    #[inline]
    pub fn path(&self, channel: usize, cycle: usize) -> &Path {
        &self.channels[channel][cycle]
    }
}

fn read_list_file(path: &Path) -> Result<Vec<PathBuf>> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::FileList {
        path: path.to_path_buf(),
        source,
    })?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));

    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| {
            let entry = Path::new(line);
            if entry.is_absolute() {
                entry.to_path_buf()
            } else {
                base.join(entry)
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(PathBuf::from).collect()
    }

    #[test]
    fn test_new_accepts_equal_lengths() {
        let lists = FileLists::new(vec![paths(&["a0", "a1"]), paths(&["c0", "c1"])]).unwrap();
        assert_eq!(lists.num_channels(), 2);
        assert_eq!(lists.num_cycles(), 2);
        assert_eq!(lists.path(1, 0), Path::new("c0"));
    }

    #[test]
    fn test_new_rejects_empty_channel() {
        let err = FileLists::new(vec![paths(&["a0"]), Vec::new()]).unwrap_err();
        assert!(matches!(err, Error::EmptyFileList { channel: 1 }));
    }

    #[test]
    fn test_new_rejects_uneven_channels() {
        let err = FileLists::new(vec![paths(&["a0", "a1"]), paths(&["c0"])]).unwrap_err();
        assert!(matches!(
            err,
            Error::ChannelLengthMismatch {
                channel: 1,
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_from_list_files_reads_and_resolves() {
        let dir = std::env::temp_dir().join(format!("flowcell_lists_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let list = dir.join("a.txt");
        std::fs::write(&list, "# channel A\ncycle0.tif\n\n/abs/cycle1.tif\n").unwrap();

        let lists = FileLists::from_list_files(&[&list]).unwrap();
        assert_eq!(lists.num_cycles(), 2);
        assert_eq!(lists.path(0, 0), dir.join("cycle0.tif"));
        assert_eq!(lists.path(0, 1), Path::new("/abs/cycle1.tif"));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_from_list_files_unreadable() {
        let err = FileLists::from_list_files(&["/definitely/not/here.txt"]).unwrap_err();
        assert!(matches!(err, Error::FileList { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn test_memory_source_missing_path() {
        let source = MemoryImageSource::new();
        let err = source.load(Path::new("nope.tif")).unwrap_err();
        assert!(matches!(err, Error::ImageLoad { .. }));
    }
}
