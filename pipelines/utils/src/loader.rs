//! 对 `mammo-berry::dataset` 的更一层封装. 提供处理后 CBIS-DDSM 数据集的路径约定.
//!
//! 目录结构:
//!
//! ```text
//! <根目录>/
//!     mass/{train, test, train_train, train_val}/<病例名>/...
//!     calc/{train, test, train_train, train_val}/<病例名>/...
//! ```

use mammo_berry::roi::LesionKind;
use std::env;
use std::path::{Path, PathBuf};

/// 所有划分. `train_train` 与 `train_val` 由 `train` 划分而来.
pub const SPLITS: [&str; 4] = ["train", "test", "train_train", "train_val"];

/// 获取处理后的 CBIS-DDSM 数据集根目录.
///
/// 1. 若环境变量 `$CBIS_DDSM_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/cbis_ddsm`. 无法确定主目录时返回 `None`.
pub fn root_from_env_or_home() -> Option<PathBuf> {
    match env::var("CBIS_DDSM_DIR") {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => mammo_berry::dataset::home_dataset_dir_with(["cbis_ddsm"]),
    }
}

/// 病灶类型对应的子目录名.
#[inline]
pub fn lesion_dir(kind: LesionKind) -> &'static str {
    match kind {
        LesionKind::Mass => "mass",
        LesionKind::Calcification => "calc",
    }
}

/// 某个病灶类型某个划分的根目录.
pub fn split_root<P: AsRef<Path>>(root: P, kind: LesionKind, split: &str) -> PathBuf {
    root.as_ref().join(lesion_dir(kind)).join(split)
}

/// 划分对应的标注表文件名. 只有测试集使用测试集的表.
pub fn annotation_file(kind: LesionKind, split: &str) -> String {
    let set = if split.starts_with("test") { "test" } else { "train" };
    format!("{}_case_description_{set}_set.csv", lesion_dir(kind))
}

/// 病灶切片的划分名: `train_train` → `train`, `train_val` → `val`, 其余不变.
pub fn patch_fold(split: &str) -> &str {
    match split {
        "train_train" => "train",
        "train_val" => "val",
        s => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(
            split_root("/data", LesionKind::Calcification, "train_val"),
            PathBuf::from("/data/calc/train_val")
        );
        assert_eq!(
            annotation_file(LesionKind::Mass, "train_val"),
            "mass_case_description_train_set.csv"
        );
        assert_eq!(
            annotation_file(LesionKind::Calcification, "test"),
            "calc_case_description_test_set.csv"
        );
        assert_eq!(patch_fold("train_train"), "train");
        assert_eq!(patch_fold("test"), "test");
    }
}
