use super::LabelError;
use itertools::Itertools;
use ndarray::{Array1, ArrayView1};
use once_cell::sync::OnceCell;
use std::collections::HashMap;

/// 组合标签中各个标签的分隔符.
pub const TAG_SEPARATOR: char = '-';

/// 一个病灶标签.
///
/// 索引均指向所属 [`Taxonomy`] 的单一标签表. 组合标签的索引升序且不重复.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum LesionLabel {
    /// 单一标签.
    Single(usize),

    /// 多个标签的组合.
    Combination(Vec<usize>),
}

impl LesionLabel {
    /// 由若干标签索引构造. 会排序去重. 索引为空时返回 `None`.
    pub fn from_indices<I: IntoIterator<Item = usize>>(it: I) -> Option<Self> {
        let v: Vec<usize> = it.into_iter().sorted_unstable().dedup().collect();
        match v.len() {
            0 => None,
            1 => Some(Self::Single(v[0])),
            _ => Some(Self::Combination(v)),
        }
    }

    /// 所有标签索引.
    pub fn indices(&self) -> &[usize] {
        match self {
            Self::Single(i) => std::slice::from_ref(i),
            Self::Combination(v) => v,
        }
    }
}

/// 一套分类体系: 有序的单一标签表, 加上数据中实际出现过的组合标签表.
///
/// 类别编号先是所有单一标签, 再是所有组合标签.
#[derive(Debug)]
pub struct Taxonomy {
    name: &'static str,
    tags: &'static [&'static str],
    combinations: &'static [&'static str],
    lookup: OnceCell<HashMap<&'static str, usize>>,
}

impl Taxonomy {
    /// 创建分类体系.
    pub const fn new(
        name: &'static str,
        tags: &'static [&'static str],
        combinations: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            tags,
            combinations,
            lookup: OnceCell::new(),
        }
    }

    /// 分类体系名.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 单一标签表.
    #[inline]
    pub fn tags(&self) -> &'static [&'static str] {
        self.tags
    }

    /// 组合标签表.
    #[inline]
    pub fn combinations(&self) -> &'static [&'static str] {
        self.combinations
    }

    /// multi-hot 向量的宽度, 即单一标签个数.
    #[inline]
    pub fn width(&self) -> usize {
        self.tags.len()
    }

    /// 全部类别, 先单一标签后组合标签.
    pub fn classes(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.tags.iter().chain(self.combinations.iter()).copied()
    }

    /// 类别 `name` 的编号. 必须与某个类别名完全一致.
    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.classes().position(|c| c == name)
    }

    /// 单一标签 `tag` 的索引.
    pub fn tag_index(&self, tag: &str) -> Result<usize, LabelError> {
        let lookup = self
            .lookup
            .get_or_init(|| self.tags.iter().enumerate().map(|(i, &t)| (t, i)).collect());
        lookup
            .get(tag)
            .copied()
            .ok_or_else(|| LabelError::UnknownTag {
                taxonomy: self.name,
                tag: tag.to_owned(),
            })
    }

    /// 解析 `-` 连接的类别名. 标签的顺序无关紧要.
    pub fn parse(&self, name: &str) -> Result<LesionLabel, LabelError> {
        let indices = name
            .split(TAG_SEPARATOR)
            .map(|t| self.tag_index(t))
            .collect::<Result<Vec<_>, _>>()?;
        LesionLabel::from_indices(indices).ok_or(LabelError::Empty)
    }

    fn tag(&self, index: usize) -> Result<&'static str, LabelError> {
        self.tags
            .get(index)
            .copied()
            .ok_or(LabelError::IndexOutOfRange(index, self.width()))
    }

    /// 标签的规范名称.
    ///
    /// 如果某个已知类别恰好由这些标签组成, 返回该类别名 (保持其原有的标签顺序);
    /// 否则将标签名按字典序排序后用 `-` 连接.
    pub fn name_of(&self, label: &LesionLabel) -> Result<String, LabelError> {
        let tags: Vec<&str> = label
            .indices()
            .iter()
            .map(|&i| self.tag(i))
            .collect::<Result<_, _>>()?;
        let known = self.classes().find(|c| {
            let parts: Vec<&str> = c.split(TAG_SEPARATOR).sorted_unstable().dedup().collect();
            parts.len() == tags.len() && parts.iter().all(|p| tags.contains(p))
        });
        Ok(match known {
            Some(c) => c.to_owned(),
            None => tags.iter().sorted_unstable().join("-"),
        })
    }

    /// 转换为 multi-hot 向量.
    pub fn to_multi_hot(&self, label: &LesionLabel) -> Result<Array1<u8>, LabelError> {
        let mut ans = Array1::zeros(self.width());
        for &i in label.indices() {
            self.tag(i)?;
            ans[i] = 1;
        }
        Ok(ans)
    }

    /// 由 multi-hot 向量还原标签. 向量只能含 0 和 1, 且至少一个 1.
    pub fn from_multi_hot(&self, v: ArrayView1<u8>) -> Result<LesionLabel, LabelError> {
        if v.len() != self.width() {
            return Err(LabelError::WidthMismatch {
                expected: self.width(),
                found: v.len(),
            });
        }
        if let Some(&bad) = v.iter().find(|&&x| x > 1) {
            return Err(LabelError::NotBinary(bad));
        }
        let ones = v.iter().positions(|&x| x == 1);
        LesionLabel::from_indices(ones).ok_or(LabelError::Empty)
    }
}

/// 肿块形状.
pub static MASS_SHAPE: Taxonomy = Taxonomy::new(
    "mass_shape",
    &[
        "ROUND",
        "OVAL",
        "IRREGULAR",
        "LOBULATED",
        "ARCHITECTURAL_DISTORTION",
        "ASYMMETRIC_BREAST_TISSUE",
        "LYMPH_NODE",
        "FOCAL_ASYMMETRIC_DENSITY",
    ],
    &[
        "IRREGULAR-ARCHITECTURAL_DISTORTION",
        "IRREGULAR-ASYMMETRIC_BREAST_TISSUE",
        "IRREGULAR-FOCAL_ASYMMETRIC_DENSITY",
        "LOBULATED-ARCHITECTURAL_DISTORTION",
        "LOBULATED-IRREGULAR",
        "LOBULATED-LYMPH_NODE",
        "LOBULATED-OVAL",
        "OVAL-LOBULATED",
        "OVAL-LYMPH_NODE",
        "ROUND-IRREGULAR-ARCHITECTURAL_DISTORTION",
        "ROUND-LOBULATED",
        "ROUND-OVAL",
    ],
);

/// 肿块边缘.
pub static MASS_MARGINS: Taxonomy = Taxonomy::new(
    "mass_margins",
    &[
        "ILL_DEFINED",
        "CIRCUMSCRIBED",
        "SPICULATED",
        "MICROLOBULATED",
        "OBSCURED",
    ],
    &[
        "CIRCUMSCRIBED-ILL_DEFINED",
        "CIRCUMSCRIBED-OBSCURED",
        "CIRCUMSCRIBED-OBSCURED-ILL_DEFINED",
        "CIRCUMSCRIBED-MICROLOBULATED",
        "CIRCUMSCRIBED-MICROLOBULATED-ILL_DEFINED",
        "CIRCUMSCRIBED-SPICULATED",
        "ILL_DEFINED-SPICULATED",
        "MICROLOBULATED-ILL_DEFINED",
        "MICROLOBULATED-ILL_DEFINED-SPICULATED",
        "MICROLOBULATED-SPICULATED",
        "OBSCURED-CIRCUMSCRIBED",
        "OBSCURED-ILL_DEFINED",
        "OBSCURED-ILL_DEFINED-SPICULATED",
        "OBSCURED-SPICULATED",
    ],
);

/// 钙化类型.
pub static CALC_TYPE: Taxonomy = Taxonomy::new(
    "calc_type",
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
    ],
    &[
        "AMORPHOUS-PLEOMORPHIC",
        "AMORPHOUS-ROUND_AND_REGULAR",
        "COARSE-LUCENT_CENTER",
        "COARSE-PLEOMORPHIC",
        "COARSE-ROUND_AND_REGULAR",
        "COARSE-ROUND_AND_REGULAR-LUCENT_CENTER",
        "LARGE_RODLIKE-ROUND_AND_REGULAR",
        "LUCENT_CENTER-PUNCTATE",
        "PLEOMORPHIC-AMORPHOUS",
        "PLEOMORPHIC-FINE_LINEAR_BRANCHING",
        "PUNCTATE-AMORPHOUS",
        "PUNCTATE-AMORPHOUS-PLEOMORPHIC",
        "PUNCTATE-FINE_LINEAR_BRANCHING",
        "PUNCTATE-LUCENT_CENTER",
        "PUNCTATE-PLEOMORPHIC",
        "PUNCTATE-ROUND_AND_REGULAR",
        "ROUND_AND_REGULAR-AMORPHOUS",
        "ROUND_AND_REGULAR-EGGSHELL",
        "ROUND_AND_REGULAR-LUCENT_CENTER",
        "ROUND_AND_REGULAR-LUCENT_CENTER-DYSTROPHIC",
        "ROUND_AND_REGULAR-LUCENT_CENTER-PUNCTATE",
        "ROUND_AND_REGULAR-PLEOMORPHIC",
        "ROUND_AND_REGULAR-PUNCTATE",
        "ROUND_AND_REGULAR-PUNCTATE-AMORPHOUS",
        "SKIN-COARSE-ROUND_AND_REGULAR",
        "SKIN-PUNCTATE",
        "SKIN-PUNCTATE-ROUND_AND_REGULAR",
        "VASCULAR-COARSE",
        "VASCULAR-COARSE-LUCENT_CENTER",
        "VASCULAR-COARSE-LUCENT_CENTER-ROUND_AND_REGULAR-PUNCTATE",
    ],
);

/// 钙化分布.
pub static CALC_DISTRIBUTION: Taxonomy = Taxonomy::new(
    "calc_dist",
    &[
        "CLUSTERED",
        "LINEAR",
        "REGIONAL",
        "DIFFUSELY_SCATTERED",
        "SEGMENTAL",
    ],
    &["CLUSTERED-LINEAR", "CLUSTERED-SEGMENTAL", "LINEAR-SEGMENTAL"],
);

/// 乳腺密度.
pub static BREAST_DENSITY: Taxonomy = Taxonomy::new("breast_density", &["1", "2", "3", "4"], &[]);

/// 病理 (二分类).
pub static PATHOLOGY: Taxonomy = Taxonomy::new("pathology", &["BENIGN", "MALIGNANT"], &[]);

/// 病灶类型与病理的四分类.
pub static FOUR_CLASS_PATHOLOGY: Taxonomy = Taxonomy::new(
    "four_class_pathology",
    &["BENIGN_MASS", "MALIGNANT_MASS", "BENIGN_CALC", "MALIGNANT_CALC"],
    &[],
);

/// 四分类再加上背景.
pub static FIVE_CLASS_PATHOLOGY: Taxonomy = Taxonomy::new(
    "five_class_pathology",
    &[
        "BACKGROUND",
        "BENIGN_MASS",
        "MALIGNANT_MASS",
        "BENIGN_CALC",
        "MALIGNANT_CALC",
    ],
    &[],
);

/// 所有内置分类体系.
pub static ALL_TAXONOMIES: [&Taxonomy; 8] = [
    &MASS_SHAPE,
    &MASS_MARGINS,
    &CALC_TYPE,
    &CALC_DISTRIBUTION,
    &BREAST_DENSITY,
    &PATHOLOGY,
    &FOUR_CLASS_PATHOLOGY,
    &FIVE_CLASS_PATHOLOGY,
];

/// 按名称查找内置分类体系.
pub fn taxonomy_by_name(name: &str) -> Option<&'static Taxonomy> {
    ALL_TAXONOMIES.iter().copied().find(|t| t.name() == name)
}
