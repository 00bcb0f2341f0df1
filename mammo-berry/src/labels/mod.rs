//! 多标签类别编码.
//!
//! CBIS-DDSM 的形态学特征经常是多个标签的组合 (如 `LOBULATED-OVAL`).
//! 这里把标签表示为 [`LesionLabel`], 并在名称和定宽 multi-hot 向量之间双向转换.

use thiserror::Error;

mod clinical;
mod taxonomy;

pub use clinical::{
    ClinicalFeatures, IgnoreGroups, CALC_FEATURE_WIDTH, CLINICAL_CALC_TYPE, DENSITY_WIDTH,
    FUSED_WIDTH, MASS_FEATURE_WIDTH,
};
pub use taxonomy::{
    taxonomy_by_name, LesionLabel, Taxonomy, ALL_TAXONOMIES, BREAST_DENSITY, CALC_DISTRIBUTION,
    CALC_TYPE, FIVE_CLASS_PATHOLOGY, FOUR_CLASS_PATHOLOGY, MASS_MARGINS, MASS_SHAPE, PATHOLOGY,
    TAG_SEPARATOR,
};

/// 标签编解码错误.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    /// 分类体系中没有这个标签.
    #[error("`{taxonomy}` 中没有标签 `{tag}`")]
    UnknownTag {
        /// 分类体系名.
        taxonomy: &'static str,
        /// 未知标签.
        tag: String,
    },

    /// 没有任何标签.
    #[error("标签为空")]
    Empty,

    /// multi-hot 向量宽度不对.
    #[error("multi-hot 向量应有 {expected} 维, 实际 {found} 维")]
    WidthMismatch {
        /// 期望宽度.
        expected: usize,
        /// 实际宽度.
        found: usize,
    },

    /// multi-hot 向量含有 0/1 以外的值.
    #[error("multi-hot 向量含有非法值 {0}")]
    NotBinary(u8),

    /// 标签索引越界. 第二个参数为标签个数.
    #[error("标签索引 {0} 越界 (共 {1} 个标签)")]
    IndexOutOfRange(usize, usize),

    /// 乳腺密度不在 1 ~ 4 内.
    #[error("非法的乳腺密度 {0}")]
    Density(u8),
}
