//! 处理后数据集的统计.

use super::DatasetError;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

/// 病灶切片统计的划分.
pub const PATCH_FOLDS: [&str; 2] = ["train", "val"];

/// 处理后 CBIS-DDSM 数据集的统计.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DatasetStatistics {
    /// 肿块训练集图像数.
    pub mass_train: usize,

    /// 肿块测试集图像数.
    pub mass_test: usize,

    /// 钙化训练集图像数.
    pub calc_train: usize,

    /// 钙化测试集图像数.
    pub calc_test: usize,

    /// `特征名 -> 类别名 -> [训练, 验证]` 的切片个数.
    pub features: BTreeMap<String, BTreeMap<String, [usize; 2]>>,
}

impl DatasetStatistics {
    /// 肿块图像总数.
    #[inline]
    pub fn mass_total(&self) -> usize {
        self.mass_train + self.mass_test
    }

    /// 钙化图像总数.
    #[inline]
    pub fn calc_total(&self) -> usize {
        self.calc_train + self.calc_test
    }
}

/// `dir` 下名称以 `prefix` 开头的条目个数. 目录不存在时为 0.
fn count_prefixed(dir: &Path, prefix: &str) -> io::Result<usize> {
    if !dir.is_dir() {
        return Ok(0);
    }
    let mut ans = 0;
    for entry in fs::read_dir(dir)? {
        if entry?.file_name().to_string_lossy().starts_with(prefix) {
            ans += 1;
        }
    }
    Ok(ans)
}

/// `dir` 下所有子目录 `(名称, 路径)`, 按名称排序. 目录不存在时为空.
fn sub_dirs(dir: &Path) -> io::Result<Vec<(String, std::path::PathBuf)>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut ans = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            ans.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
        }
    }
    ans.sort();
    Ok(ans)
}

/// 统计 `mass_root` 和 `calc_root` 下的训练/测试图像数,
/// 以及 `mass_root/cls/<特征>/{train,val}/<类别>/*.png` 的切片数.
pub fn statistics<P: AsRef<Path>, Q: AsRef<Path>>(
    mass_root: P,
    calc_root: Q,
) -> Result<DatasetStatistics, DatasetError> {
    let (mass_root, calc_root) = (mass_root.as_ref(), calc_root.as_ref());
    let mut ans = DatasetStatistics {
        mass_train: count_prefixed(&mass_root.join("train"), "Mass-Training")?,
        mass_test: count_prefixed(&mass_root.join("test"), "Mass-Test")?,
        calc_train: count_prefixed(&calc_root.join("train"), "Calc-Training")?,
        calc_test: count_prefixed(&calc_root.join("test"), "Calc-Test")?,
        features: BTreeMap::new(),
    };

    for (feature, feature_path) in sub_dirs(&mass_root.join("cls"))? {
        let classes = ans.features.entry(feature).or_default();
        for (fold, fold_name) in PATCH_FOLDS.iter().enumerate() {
            for (class, class_path) in sub_dirs(&feature_path.join(fold_name))? {
                let n = count_png(&class_path)?;
                classes.entry(class).or_default()[fold] += n;
            }
        }
    }
    Ok(ans)
}

fn count_png(dir: &Path) -> io::Result<usize> {
    let mut ans = 0;
    for entry in fs::read_dir(dir)? {
        if entry?.path().extension().is_some_and(|e| e == "png") {
            ans += 1;
        }
    }
    Ok(ans)
}

impl fmt::Display for DatasetStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "肿块图像总数: {}", self.mass_total())?;
        writeln!(f, "\t训练: {}", self.mass_train)?;
        writeln!(f, "\t测试: {}", self.mass_test)?;
        writeln!(f, "钙化图像总数: {}", self.calc_total())?;
        writeln!(f, "\t训练: {}", self.calc_train)?;
        writeln!(f, "\t测试: {}", self.calc_test)?;
        for (feature, classes) in self.features.iter() {
            writeln!(f, "特征 {feature}:")?;
            for (class, [train, val]) in classes.iter() {
                writeln!(f, "{class:>40} {train:>4} {val:>4}")?;
            }
        }
        Ok(())
    }
}
