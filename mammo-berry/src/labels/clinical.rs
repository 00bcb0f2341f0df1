//! 临床特征向量.
//!
//! 肿块: 形状 (8) ⊕ 边缘 (5), 共 13 维. 钙化: 类型 (14) ⊕ 分布 (5), 共 19 维.
//! 乳腺密度单独编码为 4 维 one-hot. 融合向量为 `[密度 4, 肿块 13, 钙化 19]`,
//! 共 36 维, 不属于当前病灶类型的那一段全为 0.

use super::taxonomy::{Taxonomy, CALC_DISTRIBUTION, MASS_MARGINS, MASS_SHAPE, TAG_SEPARATOR};
use super::LabelError;
use crate::roi::{AnnotationRow, LesionKind};
use ndarray::{s, Array1};

/// 临床特征中的钙化类型表. 比分类用的表多出数据中偶尔出现的 `LUCENT_CENTERED`.
pub static CLINICAL_CALC_TYPE: Taxonomy = Taxonomy::new(
    "clinical_calc_type",
    &[
        "AMORPHOUS",
        "PUNCTATE",
        "VASCULAR",
        "LARGE_RODLIKE",
        "DYSTROPHIC",
        "SKIN",
        "MILK_OF_CALCIUM",
        "EGGSHELL",
        "PLEOMORPHIC",
        "COARSE",
        "FINE_LINEAR_BRANCHING",
        "LUCENT_CENTER",
        "ROUND_AND_REGULAR",
        "LUCENT_CENTERED",
    ],
    &[],
);

/// 乳腺密度 one-hot 的宽度.
pub const DENSITY_WIDTH: usize = 4;

/// 肿块特征向量的宽度.
pub const MASS_FEATURE_WIDTH: usize = 13;

/// 钙化特征向量的宽度.
pub const CALC_FEATURE_WIDTH: usize = 19;

/// 融合特征向量的宽度.
pub const FUSED_WIDTH: usize = DENSITY_WIDTH + MASS_FEATURE_WIDTH + CALC_FEATURE_WIDTH;

/// 需要置零的特征组, 依次为密度, 第一个形态学特征, 第二个形态学特征.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IgnoreGroups(pub [bool; 3]);

/// 一个病灶的临床特征.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClinicalFeatures {
    /// 病灶类型.
    pub kind: LesionKind,

    /// 密度 one-hot.
    pub density: Array1<u8>,

    /// 形态学特征的 multi-hot, 肿块 13 维或钙化 19 维.
    pub features: Array1<u8>,
}

/// `name` 可以是单一标签, 也可以是 `-` 连接的组合. 缺失时为全 0.
fn encode_group(t: &Taxonomy, name: Option<&str>) -> Result<Array1<u8>, LabelError> {
    let mut ans = Array1::zeros(t.width());
    if let Some(name) = name.filter(|s| !s.is_empty()) {
        for tag in name.split(TAG_SEPARATOR) {
            ans[t.tag_index(tag)?] = 1;
        }
    }
    Ok(ans)
}

fn encode_density(density: u8) -> Result<Array1<u8>, LabelError> {
    if !(1..=4).contains(&density) {
        return Err(LabelError::Density(density));
    }
    let mut ans = Array1::zeros(DENSITY_WIDTH);
    ans[usize::from(density) - 1] = 1;
    Ok(ans)
}

impl ClinicalFeatures {
    /// 编码肿块特征.
    pub fn mass(
        density: u8,
        shape: Option<&str>,
        margins: Option<&str>,
        ignore: IgnoreGroups,
    ) -> Result<Self, LabelError> {
        let first = encode_group(&MASS_SHAPE, shape)?;
        let second = encode_group(&MASS_MARGINS, margins)?;
        Self::assemble(LesionKind::Mass, encode_density(density)?, first, second, ignore)
    }

    /// 编码钙化特征. 密度 0 视为 1 (数据中有个别标注错误).
    pub fn calcification(
        density: u8,
        calc_type: Option<&str>,
        distribution: Option<&str>,
        ignore: IgnoreGroups,
    ) -> Result<Self, LabelError> {
        let density = if density == 0 { 1 } else { density };
        let first = encode_group(&CLINICAL_CALC_TYPE, calc_type)?;
        let second = encode_group(&CALC_DISTRIBUTION, distribution)?;
        Self::assemble(
            LesionKind::Calcification,
            encode_density(density)?,
            first,
            second,
            ignore,
        )
    }

    fn assemble(
        kind: LesionKind,
        mut density: Array1<u8>,
        mut first: Array1<u8>,
        mut second: Array1<u8>,
        IgnoreGroups(ignore): IgnoreGroups,
    ) -> Result<Self, LabelError> {
        for (v, skip) in [&mut density, &mut first, &mut second].into_iter().zip(ignore) {
            if skip {
                v.fill(0);
            }
        }
        let features = first.iter().chain(second.iter()).copied().collect();
        Ok(Self {
            kind,
            density,
            features,
        })
    }

    /// 从标注表的一行编码. 缺失的密度视为 0.
    pub fn from_row(
        kind: LesionKind,
        row: &AnnotationRow,
        ignore: IgnoreGroups,
    ) -> Result<Self, LabelError> {
        let density = row.breast_density.unwrap_or(0);
        let [first, second] = kind.features(row);
        match kind {
            LesionKind::Mass => Self::mass(density, first, second, ignore),
            LesionKind::Calcification => Self::calcification(density, first, second, ignore),
        }
    }

    /// 36 维融合向量.
    pub fn fused(&self) -> Array1<u8> {
        let mut ans = Array1::zeros(FUSED_WIDTH);
        ans.slice_mut(s![..DENSITY_WIDTH]).assign(&self.density);
        let offset = match self.kind {
            LesionKind::Mass => DENSITY_WIDTH,
            LesionKind::Calcification => DENSITY_WIDTH + MASS_FEATURE_WIDTH,
        };
        ans.slice_mut(s![offset..offset + self.features.len()])
            .assign(&self.features);
        ans
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mass_features() {
        let f = ClinicalFeatures::mass(3, Some("IRREGULAR"), Some("SPICULATED-ILL_DEFINED"), IgnoreGroups::default())
            .unwrap();
        assert_eq!(f.features.len(), MASS_FEATURE_WIDTH);
        assert_eq!(f.density.to_vec(), [0, 0, 1, 0]);
        assert_eq!(f.features.sum(), 3);
        assert_eq!(f.features[2], 1);
        assert_eq!(f.features[8], 1);
        assert_eq!(f.features[10], 1);

        let fused = f.fused();
        assert_eq!(fused.len(), FUSED_WIDTH);
        assert_eq!(fused[2], 1);
        assert_eq!(fused[4 + 2], 1);
        assert_eq!(fused.slice(s![17..]).sum(), 0);
    }

    #[test]
    fn test_calc_features() {
        let f = ClinicalFeatures::calcification(
            0,
            Some("LUCENT_CENTERED"),
            None,
            IgnoreGroups::default(),
        )
        .unwrap();
        assert_eq!(f.density.to_vec(), [1, 0, 0, 0]);
        assert_eq!(f.features.len(), CALC_FEATURE_WIDTH);
        assert_eq!(f.features[13], 1);
        assert_eq!(f.features.sum(), 1);

        let fused = f.fused();
        assert_eq!(fused.slice(s![4..17]).sum(), 0);
        assert_eq!(fused[17 + 13], 1);
    }

    #[test]
    fn test_ignore_and_errors() {
        let f = ClinicalFeatures::mass(2, Some("OVAL"), Some("OBSCURED"), IgnoreGroups([true, false, true]))
            .unwrap();
        assert_eq!(f.density.sum(), 0);
        assert_eq!(f.features.sum(), 1);
        assert_eq!(f.features[1], 1);

        assert_eq!(
            ClinicalFeatures::mass(5, None, None, IgnoreGroups::default()),
            Err(LabelError::Density(5))
        );
        assert!(matches!(
            ClinicalFeatures::mass(1, Some("HEXAGON"), None, IgnoreGroups::default()),
            Err(LabelError::UnknownTag { .. })
        ));
    }
}
