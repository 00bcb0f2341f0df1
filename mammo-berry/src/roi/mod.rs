//! 病灶标识解析与临床标注表匹配.
//!
//! 每个病灶掩膜都需要在 CSV 标注表中找到唯一对应的行, 以获得病理诊断和形态学特征.
//! 主键为 `(病人编号, 左右侧, 视图, 病灶序号)` 四元组, 均由目录名推得.
//!
//! # 示例
//!
//! ```
//! use mammo_berry::roi::{AnnotationTable, LesionIdentifier};
//!
//! let csv = "\
//! patient_id,left or right breast,image view,abnormality id,pathology
//! P_00001,LEFT,CC,1,MALIGNANT
//! ";
//! let table = AnnotationTable::from_reader(csv.as_bytes()).unwrap();
//! let id = LesionIdentifier::parse("Mass-Training_P_00001_LEFT_CC_1").unwrap();
//! assert_eq!(table.lookup(&id).unwrap().pathology, "MALIGNANT");
//! ```

mod error;
mod identifier;
mod matcher;
mod table;

pub use error::{MatchError, ParseIdentifierError, TableError};
pub use identifier::{Laterality, LesionIdentifier, View};
pub use matcher::{resolve_lesion, FeatureFilter, LesionKind, Pathology, ResolvedLesion};
pub use table::{AnnotationRow, AnnotationTable};

#[cfg(test)]
pub(crate) use table::tests::{CALC_CSV, MASS_CSV};
