//! 病例目录加载器.
//!
//! 一个划分 (例如 `mass/train`) 的根目录下, 每个病例对应一个子目录,
//! 目录名即病例名 (如 `Mass-Training_P_00001_LEFT_CC`). 子目录下有渲染好的
//! `<病例名>.png`, 原始的 `image.npz`, 以及零个或多个 `mask*.npz` 病灶掩膜.

use crate::consts::{MASK_PREFIX, NPZ_EXT};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// 一个病例目录.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaseDir {
    /// 病例名, 即目录名.
    pub name: String,

    /// 目录路径.
    pub path: PathBuf,

    /// 渲染后的图像 `<病例名>.png` 的路径. 文件不一定存在.
    pub image_path: PathBuf,

    /// 所有 `mask*.npz` 文件, 按自然顺序排列.
    pub mask_paths: Vec<PathBuf>,

    /// 目录下的文件总数.
    pub file_count: usize,
}

impl CaseDir {
    /// 扫描目录 `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_owned();
        let name = path
            .file_name()
            .and_then(|s| s.to_str())
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "病例目录名不是合法 UTF-8"))?
            .to_owned();
        let image_path = path.join(format!("{name}.png"));

        let mut file_count = 0;
        let mut mask_paths = Vec::with_capacity(2);
        for entry in fs::read_dir(&path)? {
            let entry = entry?;
            file_count += 1;
            let p = entry.path();
            if is_mask_archive(&p) {
                mask_paths.push(p);
            }
        }
        mask_paths.sort_by_cached_key(|p| natural_key(p));

        Ok(Self {
            name,
            path,
            image_path,
            mask_paths,
            file_count,
        })
    }

    /// 是否已有渲染好的图像?
    #[inline]
    pub fn has_image(&self) -> bool {
        self.image_path.is_file()
    }
}

/// 是否形如 `mask*.npz`?
fn is_mask_archive(p: &Path) -> bool {
    let Some(name) = p.file_name().and_then(|s| s.to_str()) else {
        return false;
    };
    name.starts_with(MASK_PREFIX) && p.extension().is_some_and(|e| e == NPZ_EXT) && p.is_file()
}

/// 自然排序键: `mask.npz` < `mask2.npz` < `mask10.npz`.
fn natural_key(p: &Path) -> (u64, String) {
    let stem = p
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_owned();
    let digits: String = stem.chars().filter(char::is_ascii_digit).collect();
    (digits.parse().unwrap_or(0), stem)
}

/// 从划分根目录 `root` 创建病例加载器. 子目录按名称排序.
pub fn case_loader<P: AsRef<Path>>(root: P) -> io::Result<CaseLoader> {
    let mut dirs = Vec::with_capacity(512);
    for entry in fs::read_dir(root.as_ref())? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    dirs.reverse();
    Ok(CaseLoader { data_rev: dirs })
}

/// 病例目录加载器, 按目录名顺序产出 [`CaseDir`].
#[derive(Debug)]
pub struct CaseLoader {
    data_rev: Vec<PathBuf>,
}

impl Iterator for CaseLoader {
    type Item = io::Result<CaseDir>;

    fn next(&mut self) -> Option<Self::Item> {
        let path = self.data_rev.pop()?;
        Some(CaseDir::open(path))
    }
}

impl ExactSizeIterator for CaseLoader {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}
