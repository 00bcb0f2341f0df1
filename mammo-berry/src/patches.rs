//! 病灶切片提取.
//!
//! 用病灶轮廓 (不加 0.5 偏移的整数顶点) 的包围框从渲染图像中裁出病灶切片,
//! 按病理诊断或形态学特征分目录保存, 供分类模型使用.

use crate::consts::MAX_ABNORMALITY_INDEX;
use crate::dataset::{case_loader, ArchiveError, CaseDir, NpzArchive};
use crate::roi::{resolve_lesion, AnnotationTable, FeatureFilter, LesionKind, MatchError};
use crate::{crop_inclusive, MaskSlice};
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 切片提取错误.
#[derive(Debug, Error)]
pub enum PatchError {
    /// 目录遍历或创建错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// 病灶匹配错误 (不含序号耗尽).
    #[error(transparent)]
    Match(#[from] MatchError),

    /// 掩膜读取错误.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// 图像读写错误.
    #[error(transparent)]
    Image(#[from] image::ImageError),
}

/// 一次提取的统计.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PatchSummary {
    /// 新写出的切片数.
    pub written: usize,

    /// 目标文件已存在而跳过的切片数.
    pub existing: usize,

    /// 没有渲染图像的病例数.
    pub missing_images: usize,

    /// 序号耗尽而提前结束的病例数.
    pub incomplete_cases: usize,

    /// 被跳过的病灶数 (无法匹配, 或没有合法轮廓).
    pub skipped_lesions: usize,
}

impl PatchSummary {
    fn merge(self, o: Self) -> Self {
        Self {
            written: self.written + o.written,
            existing: self.existing + o.existing,
            missing_images: self.missing_images + o.missing_images,
            incomplete_cases: self.incomplete_cases + o.incomplete_cases,
            skipped_lesions: self.skipped_lesions + o.skipped_lesions,
        }
    }
}

/// 掩膜中所有至少 3 个顶点的轮廓的整数包围框 `(x_min, y_min, x_max, y_max)`, 两端均包含.
pub fn lesion_box(mask: &MaskSlice) -> Option<(u32, u32, u32, u32)> {
    let contours = mask.contours();
    let mut points = contours
        .iter()
        .filter(|c| c.len() >= 3)
        .flat_map(|c| c.points().iter().copied());
    let (h0, w0) = points.next()?;
    let (y_min, x_min, y_max, x_max) = points.fold((h0, w0, h0, w0), |(y0, x0, y1, x1), (h, w)| {
        (y0.min(h), x0.min(w), y1.max(h), x1.max(w))
    });
    Some((x_min as u32, y_min as u32, x_max as u32, y_max as u32))
}

/// 读出掩膜并裁出病灶切片. 没有合法轮廓时返回 `None`.
fn crop_lesion(img: &DynamicImage, mask_path: &Path) -> Result<Option<DynamicImage>, PatchError> {
    let mask = NpzArchive::open(mask_path)?.mask()?;
    Ok(lesion_box(&mask.as_slice()).and_then(|b| crop_inclusive(img, b)))
}

/// 将 `patch` 写到 `dir/file`, 已存在时不覆盖. 返回是否写出.
fn save_new(patch: &DynamicImage, dir: &Path, file: &str) -> Result<bool, PatchError> {
    let path = dir.join(file);
    if path.exists() {
        return Ok(false);
    }
    fs::create_dir_all(dir)?;
    patch.save(&path)?;
    Ok(true)
}

fn collect_cases(root: &Path) -> std::io::Result<Vec<CaseDir>> {
    case_loader(root)?.collect()
}

fn run_cases<F>(cases: Vec<CaseDir>, f: F) -> Result<PatchSummary, PatchError>
where
    F: Fn(&CaseDir) -> Result<PatchSummary, PatchError> + Sync + Send,
{
    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            let results: Vec<_> = cases.into_par_iter().map(|c| f(&c)).collect();
        } else {
            let results: Vec<_> = cases.iter().map(f).collect();
        }
    }
    results
        .into_iter()
        .try_fold(PatchSummary::default(), |acc, r| Ok(acc.merge(r?)))
}

/// 按病理诊断提取切片到 `save_root/{MALIGNANT|BENIGN}/<病例名>_<病灶序号>.png`.
///
/// 给出 `filter` 时先用它过滤标注表. 某个掩膜的序号搜索耗尽时,
/// 认为该病例的特征不完整, 跳过该病例剩余的所有掩膜.
pub fn extract_pathology_patches<P: AsRef<Path>, Q: AsRef<Path>>(
    table: &AnnotationTable,
    root: P,
    save_root: Q,
    filter: Option<FeatureFilter>,
) -> Result<PatchSummary, PatchError> {
    let mut table = table.clone();
    if let Some(f) = filter {
        f.apply(&mut table);
    }
    let save_root = save_root.as_ref();
    let cases = collect_cases(root.as_ref())?;

    run_cases(cases, |case| {
        let mut ans = PatchSummary::default();
        if !case.has_image() {
            ans.missing_images += 1;
            return Ok(ans);
        }
        let img = image::open(&case.image_path)?;
        for (roi_idx, mask_path) in case.mask_paths.iter().enumerate() {
            let resolved = match resolve_lesion(&table, &case.name, roi_idx as u32, MAX_ABNORMALITY_INDEX) {
                Ok(r) => r,
                Err(MatchError::Exhausted { .. }) => {
                    log::warn!("ROI features contain NA or combined type: {}", case.name);
                    ans.incomplete_cases += 1;
                    ans.skipped_lesions += case.mask_paths.len() - roi_idx;
                    break;
                }
                Err(e) => return Err(e.into()),
            };
            let Some(patch) = crop_lesion(&img, mask_path)? else {
                log::warn!("{} 没有合法轮廓, 跳过", mask_path.display());
                ans.skipped_lesions += 1;
                continue;
            };
            let dir = save_root.join(resolved.pathology.class_name());
            fs::create_dir_all(&dir)?;
            patch.save(dir.join(format!("{}_{}.png", case.name, resolved.index)))?;
            ans.written += 1;
        }
        Ok(ans)
    })
}

/// 按形态学特征提取切片.
///
/// 第一个特征 (肿块形状或钙化类型) 的切片写到 `first_root/<类别>/<病例名>_<病灶序号>.png`,
/// 第二个特征 (肿块边缘或钙化分布) 写到 `second_root` 下. 类别即标注表中的原始字符串,
/// 组合标签也按原样作为目录名. 缺少该特征的行不产生切片, 已存在的文件不覆盖.
pub fn extract_feature_patches<P, Q, R>(
    table: &AnnotationTable,
    root: P,
    kind: LesionKind,
    first_root: Q,
    second_root: R,
) -> Result<PatchSummary, PatchError>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let roots: [PathBuf; 2] = [first_root.as_ref().to_owned(), second_root.as_ref().to_owned()];
    let cases = collect_cases(root.as_ref())?;

    run_cases(cases, |case| {
        let mut ans = PatchSummary::default();
        if !case.has_image() {
            ans.missing_images += 1;
            return Ok(ans);
        }
        let img = image::open(&case.image_path)?;
        for (roi_idx, mask_path) in case.mask_paths.iter().enumerate() {
            let resolved = match resolve_lesion(table, &case.name, roi_idx as u32, MAX_ABNORMALITY_INDEX) {
                Ok(r) => r,
                Err(e @ MatchError::Exhausted { .. }) => {
                    log::error!("{e}, 跳过 {}", mask_path.display());
                    ans.skipped_lesions += 1;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let Some(patch) = crop_lesion(&img, mask_path)? else {
                log::warn!("{} 没有合法轮廓, 跳过", mask_path.display());
                ans.skipped_lesions += 1;
                continue;
            };

            let file = format!("{}_{}.png", case.name, resolved.index);
            for (feature, root) in kind.features(resolved.row).into_iter().zip(roots.iter()) {
                let Some(class) = feature.filter(|s| !s.is_empty()) else {
                    continue;
                };
                if save_new(&patch, &root.join(class), &file)? {
                    ans.written += 1;
                } else {
                    ans.existing += 1;
                }
            }
        }
        Ok(ans)
    })
}
