//! COCO 数据集转换.
//!
//! 对每个病例目录: 读渲染图像的尺寸, 对每个 `mask*.npz` 匹配标注行获得类别,
//! 将掩膜转换为多边形与面积, 计算紧致 bbox 并按需扩展, 最后整体写为一个 JSON 文件.

use crate::dataset::ArchiveError;
use crate::roi::{MatchError, TableError};
use thiserror::Error;

mod bbox;
mod convert;
mod gt;
mod types;

pub use bbox::BBox;
pub use convert::{build_coco, convert_cbis_to_coco, ConvertOptions, ConvertOutcome, ConvertSummary};
pub use gt::export_detection_gt;
pub use types::{
    calc_categories, mass_categories, read_json, write_json, CocoAnnotation, CocoCategory,
    CocoDataset, CocoImage, Detection, JsonError,
};

#[cfg(test)]
pub(crate) use convert::tests::{fixture, rect_mask};

/// 转换错误.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// 目录遍历错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 标注表错误.
    #[error(transparent)]
    Table(#[from] TableError),

    /// 病灶匹配错误 (不含序号耗尽, 该情况只跳过病灶).
    #[error(transparent)]
    Match(#[from] MatchError),

    /// 掩膜读取错误.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// 渲染图像读取错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),

    /// JSON 写出错误.
    #[error(transparent)]
    Json(#[from] JsonError),
}
