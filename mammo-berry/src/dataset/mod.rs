//! 数据集操作.

use std::path::{Path, PathBuf};
use thiserror::Error;

mod cases;
mod npz_database;
mod render;
mod stats;

pub use cases::{case_loader, CaseDir, CaseLoader};
pub use npz_database::{ArchiveError, MammoImage, NpzArchive};
pub use render::{render_case_images, RenderSummary};
pub use stats::{statistics, DatasetStatistics, PATCH_FOLDS};

#[cfg(test)]
pub(crate) use npz_database::tests::write_npz;

/// 数据集目录层面的错误.
#[derive(Debug, Error)]
pub enum DatasetError {
    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// npz 归档错误.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// 图像编解码错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}
