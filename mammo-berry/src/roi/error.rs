//! 病灶匹配的运行时错误.

use std::path::PathBuf;
use thiserror::Error;

/// 解析病灶标识错误.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseIdentifierError {
    /// 以 `_` 分割后不是恰好 6 段. 参数为实际段数.
    #[error("病灶标识 `{0}` 应当恰好有 6 段, 实际有 {1} 段")]
    TokenCount(String, usize),

    /// 左右侧不是 `LEFT` 或 `RIGHT`.
    #[error("未知的左右侧 `{0}`")]
    Laterality(String),

    /// 视图不是 `CC` 或 `MLO`.
    #[error("未知的视图 `{0}`")]
    View(String),

    /// 病灶序号不是正整数.
    #[error("病灶序号 `{0}` 不是正整数")]
    Index(String),
}

/// 在标注表中匹配病灶的错误.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MatchError {
    /// 标识本身不合法.
    #[error(transparent)]
    Identifier(#[from] ParseIdentifierError),

    /// 没有任何行匹配.
    #[error("No ROI was found for ROI_ID: {0}")]
    NotFound(String),

    /// 有多于一行匹配. 第二个参数为匹配行数.
    #[error("ROI_ID `{0}` 匹配了 {1} 行标注")]
    Ambiguous(String, usize),

    /// 病理标签无法识别.
    #[error("Label: {label} is unrecognized for ROI_ID: {roi}")]
    UnknownPathology {
        /// 原始标签.
        label: String,
        /// 病灶标识.
        roi: String,
    },

    /// 序号搜索达到上界仍未匹配.
    #[error("病例 `{case}` 在序号 {start}..={cap} 内没有匹配的标注")]
    Exhausted {
        /// 病例名.
        case: String,
        /// 搜索起点 (不含).
        start: u32,
        /// 搜索上界 (含).
        cap: u32,
    },
}

/// 读取标注表错误.
#[derive(Debug, Error)]
pub enum TableError {
    /// 无法打开文件.
    #[error("无法打开标注表 `{path}`: {source}")]
    Open {
        /// 文件路径.
        path: PathBuf,
        /// 底层错误.
        source: csv::Error,
    },

    /// CSV 格式或字段错误.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}
