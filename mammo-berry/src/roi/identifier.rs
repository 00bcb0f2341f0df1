use super::ParseIdentifierError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 左右侧乳房.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Laterality {
    /// 左侧.
    #[serde(rename = "LEFT")]
    Left,

    /// 右侧.
    #[serde(rename = "RIGHT")]
    Right,
}

/// 钼靶投照视图.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum View {
    /// 头尾位.
    #[serde(rename = "CC")]
    Cc,

    /// 内外斜位.
    #[serde(rename = "MLO")]
    Mlo,
}

impl FromStr for Laterality {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LEFT" => Ok(Self::Left),
            "RIGHT" => Ok(Self::Right),
            other => Err(ParseIdentifierError::Laterality(other.to_owned())),
        }
    }
}

impl FromStr for View {
    type Err = ParseIdentifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CC" => Ok(Self::Cc),
            "MLO" => Ok(Self::Mlo),
            other => Err(ParseIdentifierError::View(other.to_owned())),
        }
    }
}

impl fmt::Display for Laterality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Left => "LEFT",
            Self::Right => "RIGHT",
        })
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cc => "CC",
            Self::Mlo => "MLO",
        })
    }
}

/// 病灶标识, 即标注表中的四元组主键.
///
/// 由病灶名 (`<病例名>_<序号>`, 如 `Mass-Training_P_00001_LEFT_CC_1`) 解析而来,
/// 前两段 (数据集与用途前缀) 被丢弃.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LesionIdentifier {
    /// 带 `P_` 前缀的病人编号, 与标注表一致.
    pub patient_id: String,

    /// 左右侧.
    pub laterality: Laterality,

    /// 视图.
    pub view: View,

    /// 从 1 开始的病灶序号, 在 `(病人, 左右侧, 视图)` 内唯一.
    pub abnormality_index: u32,
}

impl LesionIdentifier {
    /// 解析病灶名.
    pub fn parse(roi: &str) -> Result<Self, ParseIdentifierError> {
        let tokens: Vec<&str> = roi.split('_').collect();
        let &[_, _, patient, laterality, view, index] = tokens.as_slice() else {
            return Err(ParseIdentifierError::TokenCount(roi.to_owned(), tokens.len()));
        };
        let abnormality_index = index
            .parse::<u32>()
            .ok()
            .filter(|&i| i > 0)
            .ok_or_else(|| ParseIdentifierError::Index(index.to_owned()))?;
        Ok(Self {
            patient_id: format!("P_{patient}"),
            laterality: laterality.parse()?,
            view: view.parse()?,
            abnormality_index,
        })
    }

    /// 由病例名与病灶序号构造.
    #[inline]
    pub fn from_case(case: &str, index: u32) -> Result<Self, ParseIdentifierError> {
        Self::parse(&format!("{case}_{index}"))
    }
}

impl fmt::Display for LesionIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}_{}",
            self.patient_id, self.laterality, self.view, self.abnormality_index
        )
    }
}
