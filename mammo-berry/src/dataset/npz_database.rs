use crate::consts::{IMAGE_KEY, MASK_KEY};
use crate::OwnedMask;
use ndarray::{Array2, Ix2, OwnedRepr};
use ndarray_npy::{NpzReader, ReadNpzError};
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 读取 npz 归档错误.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// 底层 I/O 错误.
    #[error("无法打开 `{path}`: {source}")]
    Io {
        /// 归档路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// npz 格式或数组读取错误.
    #[error("读取 `{path}` 失败: {source}")]
    Npz {
        /// 归档路径.
        path: PathBuf,
        /// 底层错误.
        source: ReadNpzError,
    },

    /// 归档中没有给定的键.
    #[error("`{path}` 中没有名为 `{key}` 的数组")]
    MissingKey {
        /// 归档路径.
        path: PathBuf,
        /// 要找的键.
        key: &'static str,
    },

    /// 数组存在, 但元素类型不受支持.
    #[error("`{path}` 中 `{key}` 的元素类型不受支持")]
    UnsupportedDtype {
        /// 归档路径.
        path: PathBuf,
        /// 数组的键.
        key: &'static str,
    },
}

/// 病例目录中的原始钼靶图像. CBIS-DDSM 中既有 8 位也有 16 位图像.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MammoImage {
    /// 8 位灰度.
    U8(Array2<u8>),

    /// 16 位灰度.
    U16(Array2<u16>),
}

impl MammoImage {
    /// 图像的 `(h, w)`.
    pub fn shape(&self) -> (usize, usize) {
        match self {
            Self::U8(a) => a.dim(),
            Self::U16(a) => a.dim(),
        }
    }
}

/// 单个 npz 文件归档.
///
/// 同一个 key 在归档中可能叫 `mask` 也可能叫 `mask.npy`, 两者都接受.
pub struct NpzArchive {
    reader: NpzReader<File>,
    path: PathBuf,
}

impl NpzArchive {
    /// 打开位于 `p` 的 npz 文件.
    pub fn open<P: AsRef<Path>>(p: P) -> Result<Self, ArchiveError> {
        let path = p.as_ref().to_owned();
        let file = File::open(&path).map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;
        let reader = NpzReader::new(file).map_err(|source| ArchiveError::Npz {
            path: path.clone(),
            source,
        })?;
        Ok(Self { reader, path })
    }

    /// 归档的路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 获取底层 npz 文件包含的所有文件名.
    pub fn names(&mut self) -> Result<Vec<String>, ArchiveError> {
        self.reader.names().map_err(|source| ArchiveError::Npz {
            path: self.path.clone(),
            source,
        })
    }

    /// 找到 `key` 在归档中的真实文件名.
    fn entry_name(&mut self, key: &'static str) -> Result<String, ArchiveError> {
        let with_ext = format!("{key}.npy");
        self.names()?
            .into_iter()
            .find(|n| n == key || *n == with_ext)
            .ok_or_else(|| ArchiveError::MissingKey {
                path: self.path.clone(),
                key,
            })
    }

    fn read<T: ndarray_npy::ReadableElement>(
        &mut self,
        name: &str,
    ) -> Result<Array2<T>, ReadNpzError> {
        self.reader.by_name::<OwnedRepr<T>, Ix2>(name)
    }

    /// 读取键为 `mask` 的 2D 病灶掩膜. 元素类型可以是 `u8` 或 `bool`.
    pub fn mask(&mut self) -> Result<OwnedMask, ArchiveError> {
        let name = self.entry_name(MASK_KEY)?;
        if let Ok(data) = self.read::<u8>(&name) {
            return Ok(OwnedMask::from_raw(data));
        }
        match self.read::<bool>(&name) {
            Ok(data) => Ok(OwnedMask::from_raw(data.mapv(u8::from))),
            Err(ReadNpzError::Npy(_)) => Err(ArchiveError::UnsupportedDtype {
                path: self.path.clone(),
                key: MASK_KEY,
            }),
            Err(source) => Err(ArchiveError::Npz {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// 读取键为 `image` 的 2D 钼靶图像. 元素类型可以是 `u8` 或 `u16`.
    pub fn image(&mut self) -> Result<MammoImage, ArchiveError> {
        let name = self.entry_name(IMAGE_KEY)?;
        if let Ok(data) = self.read::<u8>(&name) {
            return Ok(MammoImage::U8(data));
        }
        match self.read::<u16>(&name) {
            Ok(data) => Ok(MammoImage::U16(data)),
            Err(ReadNpzError::Npy(_)) => Err(ArchiveError::UnsupportedDtype {
                path: self.path.clone(),
                key: IMAGE_KEY,
            }),
            Err(source) => Err(ArchiveError::Npz {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ndarray::Array2;
    use ndarray_npy::NpzWriter;

    /// 写出一个只含 `key` 的 npz 文件.
    pub(crate) fn write_npz<T: ndarray_npy::WritableElement>(
        path: &Path,
        key: &str,
        data: &Array2<T>,
    ) {
        let mut npz = NpzWriter::new(File::create(path).unwrap());
        npz.add_array(key, data).unwrap();
        npz.finish().unwrap();
    }

    #[test]
    fn test_read_mask() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.npz");
        let data = Array2::from_shape_fn((4, 5), |(h, w)| u8::from(h == w));
        write_npz(&path, "mask", &data);

        let mut npz = NpzArchive::open(&path).unwrap();
        let m = npz.mask().unwrap();
        assert_eq!(m.as_slice().lesion_count(), 4);
        assert!(matches!(npz.image(), Err(ArchiveError::MissingKey { .. })));
    }

    #[test]
    fn test_read_bool_mask_and_u16_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask1.npz");
        let data = Array2::from_shape_fn((3, 3), |(h, _)| h == 1);
        write_npz(&path, "mask", &data);
        let m = NpzArchive::open(&path).unwrap().mask().unwrap();
        assert_eq!(m.as_slice().lesion_count(), 3);

        let path = dir.path().join("image.npz");
        let data = Array2::from_elem((2, 7), 4000u16);
        write_npz(&path, "image", &data);
        let img = NpzArchive::open(&path).unwrap().image().unwrap();
        assert_eq!(img.shape(), (2, 7));
        assert!(matches!(img, MammoImage::U16(_)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = NpzArchive::open(dir.path().join("nope.npz")).err().unwrap();
        assert!(matches!(err, ArchiveError::Io { .. }));
    }
}
