//! COCO 格式的数据类型.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// 读写 JSON 文件错误.
#[derive(Debug, Error)]
pub enum JsonError {
    /// 底层 I/O 错误.
    #[error("无法访问 `{path}`: {source}")]
    Io {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: std::io::Error,
    },

    /// JSON 格式错误.
    #[error("`{path}` JSON 编解码失败: {source}")]
    Parse {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: serde_json::Error,
    },
}

/// 从 `path` 读取 JSON.
pub fn read_json<T: for<'de> Deserialize<'de>, P: AsRef<Path>>(path: P) -> Result<T, JsonError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| JsonError::Io {
        path: path.to_owned(),
        source,
    })?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| JsonError::Parse {
        path: path.to_owned(),
        source,
    })
}

/// 将 `value` 写入 `path`.
pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<(), JsonError> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|source| JsonError::Io {
        path: path.to_owned(),
        source,
    })?;
    let mut w = BufWriter::new(file);
    serde_json::to_writer(&mut w, value).map_err(|source| JsonError::Parse {
        path: path.to_owned(),
        source,
    })?;
    w.flush().map_err(|source| JsonError::Io {
        path: path.to_owned(),
        source,
    })
}

/// 图像记录.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoImage {
    /// 图像编号.
    pub id: u64,

    /// 相对数据集根目录的文件路径, 如 `<病例名>/<病例名>.png`.
    pub file_name: String,

    /// 图像的高.
    pub height: u32,

    /// 图像的宽.
    pub width: u32,
}

/// 标注记录.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    /// 标注编号.
    pub id: u64,

    /// 所属图像的编号.
    pub image_id: u64,

    /// 类别编号.
    pub category_id: u32,

    /// `[x, y, w, h]`.
    pub bbox: [f64; 4],

    /// 病灶像素面积.
    #[serde(default)]
    pub area: f64,

    /// 多边形列表, 每个多边形为 `[x1, y1, x2, y2, ...]`.
    #[serde(default)]
    pub segmentation: Vec<Vec<f64>>,

    /// 总是 0.
    #[serde(default)]
    pub iscrowd: u8,
}

/// 类别记录.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CocoCategory {
    /// 类别编号.
    pub id: u32,

    /// 类别名.
    pub name: String,

    /// 父类别名.
    #[serde(default)]
    pub supercategory: String,
}

impl CocoCategory {
    /// 直接构造.
    pub fn new(id: u32, name: &str, supercategory: &str) -> Self {
        Self {
            id,
            name: name.to_owned(),
            supercategory: supercategory.to_owned(),
        }
    }
}

/// 完整的 COCO 数据集.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
    /// 所有图像.
    pub images: Vec<CocoImage>,

    /// 所有标注.
    pub annotations: Vec<CocoAnnotation>,

    /// 所有类别.
    pub categories: Vec<CocoCategory>,
}

impl CocoDataset {
    /// 从 JSON 文件读取.
    #[inline]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, JsonError> {
        read_json(path)
    }

    /// 写入 JSON 文件.
    #[inline]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), JsonError> {
        write_json(self, path)
    }

    /// 编号为 `id` 的类别名.
    pub fn category_name(&self, id: u32) -> Option<&str> {
        self.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    }

    /// 图像 `image_id` 上的所有标注.
    pub fn annotations_of(&self, image_id: u64) -> impl Iterator<Item = &CocoAnnotation> {
        self.annotations
            .iter()
            .filter(move |a| a.image_id == image_id)
    }
}

/// 检测模型输出的一条检测结果.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    /// 图像编号.
    pub image_id: u64,

    /// 类别编号.
    pub category_id: u32,

    /// `[x, y, w, h]`.
    pub bbox: [f64; 4],

    /// 置信度, 位于 `[0, 1]`.
    pub score: f64,
}

/// 肿块数据集的类别.
pub fn mass_categories() -> Vec<CocoCategory> {
    vec![
        CocoCategory::new(0, "malignant-mass", "mass"),
        CocoCategory::new(1, "benign-mass", "mass"),
    ]
}

/// 钙化数据集的类别.
pub fn calc_categories() -> Vec<CocoCategory> {
    vec![
        CocoCategory::new(0, "malignant-calc", "calcification"),
        CocoCategory::new(1, "benign-calc", "calcification"),
    ]
}
