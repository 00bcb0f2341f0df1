use super::{Laterality, LesionIdentifier, MatchError, TableError, View};
use serde::Deserialize;
use std::io::Read;
use std::path::Path;

/// 标注表中的一行.
///
/// 只解析本 crate 用到的列, 其余列忽略. 形态学字段只在对应病灶类型的表中存在,
/// 空单元格与缺失的列都解析为 `None`.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AnnotationRow {
    /// 带 `P_` 前缀的病人编号.
    pub patient_id: String,

    /// 左右侧.
    #[serde(rename = "left or right breast")]
    pub laterality: Laterality,

    /// 视图.
    #[serde(rename = "image view")]
    pub view: View,

    /// 病灶序号.
    #[serde(rename = "abnormality id")]
    pub abnormality_id: u32,

    /// 原始病理标签. 用 [`super::Pathology::from_label`] 解释.
    pub pathology: String,

    /// 乳腺密度 (1 ~ 4). 肿块表中叫 `breast_density`, 钙化表中叫 `breast density`.
    #[serde(default, alias = "breast density")]
    pub breast_density: Option<u8>,

    /// 肿块形状.
    #[serde(default, rename = "mass shape")]
    pub mass_shape: Option<String>,

    /// 肿块边缘.
    #[serde(default, rename = "mass margins")]
    pub mass_margins: Option<String>,

    /// 钙化类型.
    #[serde(default, rename = "calc type")]
    pub calc_type: Option<String>,

    /// 钙化分布.
    #[serde(default, rename = "calc distribution")]
    pub calc_distribution: Option<String>,
}

impl AnnotationRow {
    /// 该行的主键是否与 `id` 完全一致?
    #[inline]
    pub fn matches(&self, id: &LesionIdentifier) -> bool {
        self.patient_id == id.patient_id
            && self.laterality == id.laterality
            && self.view == id.view
            && self.abnormality_id == id.abnormality_index
    }
}

/// 临床标注表.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnnotationTable {
    rows: Vec<AnnotationRow>,
}

impl AnnotationTable {
    /// 从 CSV 文件读取.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, TableError> {
        let path = path.as_ref();
        let reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|source| TableError::Open {
                path: path.to_owned(),
                source,
            })?;
        let ans = Self::from_csv(reader)?;
        log::debug!("{} 含有 {} 行标注", path.display(), ans.len());
        Ok(ans)
    }

    /// 从任意 CSV 数据源读取.
    pub fn from_reader<R: Read>(rdr: R) -> Result<Self, TableError> {
        Self::from_csv(csv::ReaderBuilder::new().has_headers(true).from_reader(rdr))
    }

    fn from_csv<R: Read>(mut reader: csv::Reader<R>) -> Result<Self, TableError> {
        let rows = reader
            .deserialize()
            .collect::<Result<Vec<AnnotationRow>, csv::Error>>()?;
        Ok(Self { rows })
    }

    /// 直接由行构造.
    #[inline]
    pub fn from_rows(rows: Vec<AnnotationRow>) -> Self {
        Self { rows }
    }

    /// 行数.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// 是否没有任何行?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 所有行.
    #[inline]
    pub fn rows(&self) -> &[AnnotationRow] {
        &self.rows
    }

    /// 只保留满足 `f` 的行.
    pub fn retain<F: FnMut(&AnnotationRow) -> bool>(&mut self, f: F) {
        self.rows.retain(f);
    }

    /// 主键与 `id` 完全一致的所有行.
    pub fn matches<'a, 'b>(
        &'a self,
        id: &'b LesionIdentifier,
    ) -> impl Iterator<Item = &'a AnnotationRow> + 'b
    where
        'a: 'b,
    {
        self.rows.iter().filter(move |r| r.matches(id))
    }

    /// 唯一匹配 `id` 的行.
    ///
    /// 没有匹配时返回 [`MatchError::NotFound`], 多于一行时返回 [`MatchError::Ambiguous`].
    pub fn lookup(&self, id: &LesionIdentifier) -> Result<&AnnotationRow, MatchError> {
        let mut it = self.matches(id);
        let Some(first) = it.next() else {
            return Err(MatchError::NotFound(id.to_string()));
        };
        match it.count() {
            0 => Ok(first),
            more => Err(MatchError::Ambiguous(id.to_string(), more + 1)),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 钙化表风格的列名 (`breast density` 带空格).
    pub(crate) const CALC_CSV: &str = "\
patient_id,breast density,left or right breast,image view,abnormality id,abnormality type,calc type,calc distribution,assessment,pathology,subtlety
P_00005,3,RIGHT,CC,1,calcification,AMORPHOUS,CLUSTERED,3,MALIGNANT,3
P_00005,3,RIGHT,MLO,1,calcification,AMORPHOUS,CLUSTERED,3,MALIGNANT,3
P_00007,4,LEFT,CC,1,calcification,PLEOMORPHIC,LINEAR-SEGMENTAL,4,BENIGN,4
P_00007,4,LEFT,CC,3,calcification,PUNCTATE-PLEOMORPHIC,CLUSTERED,4,BENIGN_WITHOUT_CALLBACK,2
P_00008,2,LEFT,CC,1,calcification,,REGIONAL,2,UNKNOWN,3
";

    /// 肿块表风格的列名.
    pub(crate) const MASS_CSV: &str = "\
patient_id,breast_density,left or right breast,image view,abnormality id,abnormality type,mass shape,mass margins,assessment,pathology,subtlety
P_00001,3,LEFT,CC,1,mass,IRREGULAR-ARCHITECTURAL_DISTORTION,SPICULATED,4,MALIGNANT,4
P_00001,3,LEFT,MLO,1,mass,IRREGULAR,SPICULATED,4,MALIGNANT,4
P_00004,3,LEFT,CC,1,mass,ARCHITECTURAL_DISTORTION,ILL_DEFINED,4,BENIGN,3
P_00004,3,LEFT,CC,2,mass,OVAL,CIRCUMSCRIBED,2,BENIGN_WITHOUT_CALLBACK,5
";

    #[test]
    fn test_read_tables() {
        let calc = AnnotationTable::from_reader(CALC_CSV.as_bytes()).unwrap();
        assert_eq!(calc.len(), 5);
        let r = &calc.rows()[2];
        assert_eq!(r.breast_density, Some(4));
        assert_eq!(r.calc_distribution.as_deref(), Some("LINEAR-SEGMENTAL"));
        assert_eq!(r.mass_shape, None);
        assert_eq!(calc.rows()[4].calc_type, None);

        let mass = AnnotationTable::from_reader(MASS_CSV.as_bytes()).unwrap();
        assert_eq!(mass.rows()[0].breast_density, Some(3));
        assert_eq!(mass.rows()[3].mass_margins.as_deref(), Some("CIRCUMSCRIBED"));
        assert_eq!(mass.rows()[3].calc_type, None);
    }

    #[test]
    fn test_lookup() {
        let table = AnnotationTable::from_reader(MASS_CSV.as_bytes()).unwrap();
        let id = LesionIdentifier::parse("Mass-Training_P_00004_LEFT_CC_2").unwrap();
        let row = table.lookup(&id).unwrap();
        assert_eq!(row.pathology, "BENIGN_WITHOUT_CALLBACK");
        assert_eq!(table.matches(&id).count(), 1);

        let id = LesionIdentifier::parse("Mass-Training_P_00004_LEFT_MLO_1").unwrap();
        assert!(matches!(table.lookup(&id), Err(MatchError::NotFound(_))));
    }

    #[test]
    fn test_lookup_outlives_identifier() {
        let table = AnnotationTable::from_reader(MASS_CSV.as_bytes()).unwrap();
        let row = {
            let id = LesionIdentifier::from_case("Mass-Training_P_00001_LEFT_CC", 1).unwrap();
            table.lookup(&id).unwrap()
        };
        assert_eq!(row.pathology, "MALIGNANT");

        let rows: Vec<&AnnotationRow> = {
            let id = LesionIdentifier::from_case("Mass-Training_P_00004_LEFT_CC", 1).unwrap();
            table.matches(&id).collect()
        };
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn test_lookup_ambiguous() {
        let mut rows = AnnotationTable::from_reader(MASS_CSV.as_bytes())
            .unwrap()
            .rows()
            .to_vec();
        rows.push(rows[2].clone());
        let table = AnnotationTable::from_rows(rows);
        let id = LesionIdentifier::parse("Mass-Test_P_00004_LEFT_CC_1").unwrap();
        assert_eq!(
            table.lookup(&id),
            Err(MatchError::Ambiguous("P_00004_LEFT_CC_1".into(), 2))
        );
    }
}
