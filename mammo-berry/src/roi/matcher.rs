//! 病灶序号搜索与病理标签解释.

use super::{AnnotationRow, AnnotationTable, LesionIdentifier, MatchError};
use crate::consts::category;
use std::fmt;

/// 病理诊断.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pathology {
    /// 恶性.
    Malignant,

    /// 良性.
    Benign,

    /// 良性, 无需召回.
    BenignWithoutCallback,
}

impl Pathology {
    /// 解释标注表中的病理标签. 只接受 `MALIGNANT`, `BENIGN`, `BENIGN_WITHOUT_CALLBACK`.
    pub fn from_label(label: &str, roi: &str) -> Result<Self, MatchError> {
        match label {
            "MALIGNANT" => Ok(Self::Malignant),
            "BENIGN" => Ok(Self::Benign),
            "BENIGN_WITHOUT_CALLBACK" => Ok(Self::BenignWithoutCallback),
            _ => Err(MatchError::UnknownPathology {
                label: label.to_owned(),
                roi: roi.to_owned(),
            }),
        }
    }

    /// 检测任务的类别编号. 两种良性合并为一类.
    #[inline]
    pub fn category_id(self) -> u32 {
        match self {
            Self::Malignant => category::MALIGNANT,
            Self::Benign | Self::BenignWithoutCallback => category::BENIGN,
        }
    }

    /// 合并后的类别名, 即 `MALIGNANT` 或 `BENIGN`.
    #[inline]
    pub fn class_name(self) -> &'static str {
        match self {
            Self::Malignant => "MALIGNANT",
            Self::Benign | Self::BenignWithoutCallback => "BENIGN",
        }
    }
}

impl fmt::Display for Pathology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Malignant => "MALIGNANT",
            Self::Benign => "BENIGN",
            Self::BenignWithoutCallback => "BENIGN_WITHOUT_CALLBACK",
        })
    }
}

/// 病灶类型.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LesionKind {
    /// 肿块.
    Mass,

    /// 钙化.
    Calcification,
}

impl LesionKind {
    /// 该类型的两个形态学特征名: 肿块为形状和边缘, 钙化为类型和分布.
    pub fn feature_names(self) -> [&'static str; 2] {
        match self {
            Self::Mass => ["mass_shape", "mass_margins"],
            Self::Calcification => ["calc_type", "calc_dist"],
        }
    }

    /// 行 `row` 中该类型的两个形态学特征.
    pub fn features(self, row: &AnnotationRow) -> [Option<&str>; 2] {
        match self {
            Self::Mass => [row.mass_shape.as_deref(), row.mass_margins.as_deref()],
            Self::Calcification => [row.calc_type.as_deref(), row.calc_distribution.as_deref()],
        }
    }
}

impl fmt::Display for LesionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mass => "mass",
            Self::Calcification => "calc",
        })
    }
}

/// 去掉形态学特征缺失或为组合标签 (带 `-`) 的行.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FeatureFilter {
    kind: LesionKind,
}

impl FeatureFilter {
    /// 针对病灶类型 `kind` 的过滤器.
    #[inline]
    pub fn new(kind: LesionKind) -> Self {
        Self { kind }
    }

    /// 该行的两个特征是否都存在且都是单一标签?
    pub fn accepts(&self, row: &AnnotationRow) -> bool {
        self.kind
            .features(row)
            .iter()
            .all(|f| f.is_some_and(|s| !s.is_empty() && !s.contains('-')))
    }

    /// 就地过滤标注表.
    pub fn apply(&self, table: &mut AnnotationTable) {
        let before = table.len();
        table.retain(|r| self.accepts(r));
        log::info!(
            "{} 标注: {before} 行, 去掉缺失或组合特征后剩余 {} 行",
            self.kind,
            table.len()
        );
    }
}

/// 序号搜索的结果.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolvedLesion<'a> {
    /// 匹配到的行.
    pub row: &'a AnnotationRow,

    /// 实际匹配的病灶序号.
    pub index: u32,

    /// 该行的病理诊断.
    pub pathology: Pathology,
}

/// 为病例 `case` 中第 `start` 个 (从 0 开始) 掩膜找到对应的标注.
///
/// 掩膜文件的枚举顺序并不可靠 (部分病人的序号有空缺), 因此从序号 `start + 1`
/// 开始逐个尝试直到 `cap` (含), 每次失败都记录一条日志. 找到匹配行后立即解释病理标签,
/// 标签无法识别时直接返回错误.
pub fn resolve_lesion<'a>(
    table: &'a AnnotationTable,
    case: &str,
    start: u32,
    cap: u32,
) -> Result<ResolvedLesion<'a>, MatchError> {
    for index in start.saturating_add(1)..=cap {
        let id = LesionIdentifier::from_case(case, index)?;
        match table.lookup(&id) {
            Ok(row) => {
                let pathology = Pathology::from_label(&row.pathology, &format!("{case}_{index}"))?;
                return Ok(ResolvedLesion {
                    row,
                    index,
                    pathology,
                });
            }
            Err(MatchError::NotFound(_)) => {
                log::warn!("No ROI was found for ROI_ID: {case}_{index}");
            }
            Err(e) => return Err(e),
        }
    }
    Err(MatchError::Exhausted {
        case: case.to_owned(),
        start,
        cap,
    })
}
