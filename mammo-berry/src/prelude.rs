//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::Idx2d;

pub use crate::data::{Contour, ImgWriteRaw, MaskSlice, OwnedMask, Rle};

pub use crate::consts::category::{BENIGN, MALIGNANT};
pub use crate::consts::gray::{MASK_BACKGROUND, MASK_LESION};
pub use crate::consts::MAX_ABNORMALITY_INDEX;

pub use crate::dataset::home_dataset_dir_with;
pub use crate::dataset::{self, CaseDir, CaseLoader, NpzArchive};

pub use crate::roi::{AnnotationTable, LesionIdentifier, LesionKind, Pathology};

pub use crate::coco::{BBox, CocoDataset, ConvertOptions, ConvertOutcome};

pub use crate::eval::{BoxSelect, DetectionBox, MatchRule, PrCurve, ScoredBox};

pub use crate::labels::{LesionLabel, Taxonomy};

pub use crate::config::ExperimentConfig;

pub use crate::patches::{extract_feature_patches, extract_pathology_patches};
