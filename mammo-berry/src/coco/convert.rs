//! CBIS-DDSM 病例目录到 COCO 数据集的转换.

use super::{BBox, CocoAnnotation, CocoCategory, CocoDataset, CocoImage, ConvertError};
use crate::consts::{COCO_OUT_FILE, MAX_ABNORMALITY_INDEX};
use crate::dataset::{case_loader, CaseDir, NpzArchive};
use crate::roi::{resolve_lesion, AnnotationTable, MatchError};
use std::path::{Path, PathBuf};

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 转换选项.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvertOptions {
    /// 输出文件名, 位于数据集根目录下.
    pub out_file: String,

    /// 标注表路径, 相对数据集根目录.
    pub annotation_file: PathBuf,

    /// bbox 扩展比例. `None` 表示使用紧致 bbox.
    pub extend_ratio: Option<f64>,

    /// 扩展 bbox 时是否同时保留原始 bbox (作为另一条标注).
    pub keep_original: bool,
}

impl ConvertOptions {
    /// 紧致 bbox, 输出到默认文件名.
    pub fn tight<P: AsRef<Path>>(annotation_file: P) -> Self {
        Self {
            out_file: COCO_OUT_FILE.to_owned(),
            annotation_file: annotation_file.as_ref().to_owned(),
            extend_ratio: None,
            keep_original: false,
        }
    }

    /// 扩展 bbox, 输出到 `annotation_coco_with_classes_extend_bbox_<ratio>[_aug].json`.
    pub fn extended<P: AsRef<Path>>(annotation_file: P, ratio: f64, keep_original: bool) -> Self {
        let suffix = if keep_original { "_aug" } else { "" };
        Self {
            out_file: format!("annotation_coco_with_classes_extend_bbox_{ratio}{suffix}.json"),
            annotation_file: annotation_file.as_ref().to_owned(),
            extend_ratio: Some(ratio),
            keep_original,
        }
    }
}

/// 一次转换的统计.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConvertSummary {
    /// 输出文件.
    pub out_path: PathBuf,

    /// 图像记录数.
    pub images: usize,

    /// 标注记录数.
    pub annotations: usize,

    /// 缺少渲染图像而跳过的病例数.
    pub skipped_cases: usize,

    /// 无法匹配或没有合法多边形而跳过的病灶数.
    pub skipped_lesions: usize,
}

/// 转换结果.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConvertOutcome {
    /// 写出了新文件.
    Written(ConvertSummary),

    /// 输出文件已存在, 什么也没做.
    AlreadyExists(PathBuf),
}

/// 一个病灶, 尚未分配编号.
struct LesionRecord {
    category_id: u32,
    segmentation: Vec<Vec<f64>>,
    area: f64,
    bbox: BBox,
    shape: (usize, usize),
}

/// 一个病例, 尚未分配编号.
struct CaseRecord {
    image: CocoImage,
    lesions: Vec<LesionRecord>,
    skipped: usize,
}

/// 处理单个病例. 没有渲染图像时返回 `None`.
fn process_case(case: &CaseDir, table: &AnnotationTable) -> Result<Option<CaseRecord>, ConvertError> {
    if !case.has_image() {
        log::debug!("{} 没有渲染图像, 跳过", case.name);
        return Ok(None);
    }
    let (width, height) = image::image_dimensions(&case.image_path)?;
    let image = CocoImage {
        id: 0,
        file_name: format!("{0}/{0}.png", case.name),
        height,
        width,
    };

    let mut lesions = Vec::with_capacity(case.mask_paths.len());
    let mut skipped = 0;
    for (roi_idx, mask_path) in case.mask_paths.iter().enumerate() {
        let resolved = match resolve_lesion(table, &case.name, roi_idx as u32, MAX_ABNORMALITY_INDEX) {
            Ok(r) => r,
            Err(e @ MatchError::Exhausted { .. }) => {
                log::error!("{e}, 跳过 {}", mask_path.display());
                skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let mask = NpzArchive::open(mask_path)?.mask()?;
        let slice = mask.as_slice();
        let segmentation = slice.polygons();
        let Some(bbox) = BBox::from_polygons(&segmentation) else {
            log::warn!(
                "{}_{} 的掩膜没有合法多边形, 跳过",
                case.name,
                resolved.index
            );
            skipped += 1;
            continue;
        };
        lesions.push(LesionRecord {
            category_id: resolved.pathology.category_id(),
            area: slice.area() as f64,
            segmentation,
            bbox,
            shape: slice.shape(),
        });
    }
    Ok(Some(CaseRecord {
        image,
        lesions,
        skipped,
    }))
}

/// 在内存中构建 COCO 数据集, 不写文件.
///
/// 图像编号为病例目录在排序后的枚举序号 (跳过的目录也占用序号), 标注编号全局递增.
/// 启用 `rayon` 时病例并行处理, 但编号总是按目录顺序分配, 结果与串行完全一致.
pub fn build_coco<P: AsRef<Path>>(
    root: P,
    table: &AnnotationTable,
    categories: Vec<CocoCategory>,
    options: &ConvertOptions,
) -> Result<(CocoDataset, usize, usize), ConvertError> {
    let cases = case_loader(root)?.collect::<std::io::Result<Vec<_>>>()?;

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            let records: Vec<_> = cases
                .into_par_iter()
                .map(|c| process_case(&c, table))
                .collect();
        } else {
            let records: Vec<_> = cases.iter().map(|c| process_case(c, table)).collect();
        }
    }

    let mut ans = CocoDataset {
        categories,
        ..Default::default()
    };
    let (mut skipped_cases, mut skipped_lesions) = (0, 0);
    let mut obj_count = 0u64;
    for (idx, record) in records.into_iter().enumerate() {
        let Some(mut record) = record? else {
            skipped_cases += 1;
            continue;
        };
        let image_id = idx as u64;
        record.image.id = image_id;
        skipped_lesions += record.skipped;

        for lesion in record.lesions {
            let mut emit = |bbox: BBox| {
                ans.annotations.push(CocoAnnotation {
                    id: obj_count,
                    image_id,
                    category_id: lesion.category_id,
                    bbox: bbox.to_xywh(),
                    area: lesion.area,
                    segmentation: lesion.segmentation.clone(),
                    iscrowd: 0,
                });
                obj_count += 1;
            };
            match options.extend_ratio {
                None => emit(lesion.bbox),
                Some(ratio) => {
                    if options.keep_original {
                        emit(lesion.bbox);
                    }
                    emit(lesion.bbox.extend(lesion.shape, ratio));
                }
            }
        }
        ans.images.push(record.image);
    }
    Ok((ans, skipped_cases, skipped_lesions))
}

/// 将划分根目录 `root` 转换为 COCO 数据集, 写入 `root/<options.out_file>`.
///
/// 输出文件已存在时记录一条警告并直接返回 [`ConvertOutcome::AlreadyExists`].
pub fn convert_cbis_to_coco<P: AsRef<Path>>(
    root: P,
    categories: Vec<CocoCategory>,
    options: &ConvertOptions,
) -> Result<ConvertOutcome, ConvertError> {
    let root = root.as_ref();
    let out_path = root.join(&options.out_file);
    if out_path.exists() {
        log::warn!("{} has already existed", out_path.display());
        return Ok(ConvertOutcome::AlreadyExists(out_path));
    }

    let table = AnnotationTable::from_path(root.join(&options.annotation_file))?;
    let (coco, skipped_cases, skipped_lesions) = build_coco(root, &table, categories, options)?;
    coco.save(&out_path)?;
    log::info!(
        "{}: {} 张图像, {} 条标注",
        out_path.display(),
        coco.images.len(),
        coco.annotations.len()
    );
    Ok(ConvertOutcome::Written(ConvertSummary {
        out_path,
        images: coco.images.len(),
        annotations: coco.annotations.len(),
        skipped_cases,
        skipped_lesions,
    }))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::coco::mass_categories;
    use crate::dataset::write_npz;
    use crate::roi::MASS_CSV;
    use ndarray::Array2;
    use std::fs;

    /// 在 `root` 下创建一个病例目录: 一张 `h × w` 的 PNG, 以及给定的掩膜.
    pub(crate) fn make_case(root: &Path, name: &str, (h, w): (usize, usize), masks: &[Array2<u8>]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        image::GrayImage::from_fn(w as u32, h as u32, |x, y| image::Luma([(x + y) as u8]))
            .save(dir.join(format!("{name}.png")))
            .unwrap();
        for (k, m) in masks.iter().enumerate() {
            let file = if k == 0 {
                "mask.npz".to_owned()
            } else {
                format!("mask{}.npz", k + 1)
            };
            write_npz(&dir.join(file), "mask", m);
        }
    }

    pub(crate) fn rect_mask(shape: (usize, usize), h: (usize, usize), w: (usize, usize)) -> Array2<u8> {
        Array2::from_shape_fn(shape, |(r, c)| {
            u8::from(r >= h.0 && r <= h.1 && c >= w.0 && c <= w.1)
        })
    }

    /// 两个有图像的病例, 以及一个缺图像的病例.
    pub(crate) fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("mass.csv"), MASS_CSV).unwrap();
        make_case(
            root,
            "Mass-Training_P_00001_LEFT_CC",
            (40, 30),
            &[rect_mask((40, 30), (10, 19), (5, 14))],
        );
        // 一良性一良性无需召回, 后者贴着右下角.
        make_case(
            root,
            "Mass-Training_P_00004_LEFT_CC",
            (40, 30),
            &[
                rect_mask((40, 30), (0, 9), (0, 9)),
                rect_mask((40, 30), (30, 39), (20, 29)),
            ],
        );
        fs::create_dir(root.join("Mass-Training_P_00001_LEFT_MLO")).unwrap();
        dir
    }

    #[test]
    fn test_convert_tight() {
        let dir = fixture();
        let root = dir.path();
        let opts = ConvertOptions::tight("mass.csv");
        let outcome = convert_cbis_to_coco(root, mass_categories(), &opts).unwrap();
        let ConvertOutcome::Written(summary) = outcome else {
            panic!("应当写出新文件");
        };
        assert_eq!(summary.images, 2);
        assert_eq!(summary.annotations, 3);
        assert_eq!(summary.skipped_cases, 1);
        assert_eq!(summary.skipped_lesions, 0);

        let coco = CocoDataset::from_path(&summary.out_path).unwrap();
        // 目录排序: P_00001_LEFT_CC, P_00001_LEFT_MLO (无图像), P_00004_LEFT_CC.
        assert_eq!(coco.images[0].id, 0);
        assert_eq!(coco.images[1].id, 2);
        assert_eq!(
            coco.images[0].file_name,
            "Mass-Training_P_00001_LEFT_CC/Mass-Training_P_00001_LEFT_CC.png"
        );
        assert_eq!((coco.images[0].height, coco.images[0].width), (40, 30));

        let ids: Vec<u64> = coco.annotations.iter().map(|a| a.id).collect();
        assert_eq!(ids, [0, 1, 2]);
        let a = &coco.annotations[0];
        assert_eq!(a.category_id, 0);
        assert_eq!(a.bbox, [5.5, 10.5, 9.0, 9.0]);
        assert_eq!(a.area, 100.0);
        assert_eq!(a.segmentation.len(), 1);
        assert_eq!(a.iscrowd, 0);
        // BENIGN 与 BENIGN_WITHOUT_CALLBACK 都是类别 1.
        assert_eq!(coco.annotations[1].category_id, 1);
        assert_eq!(coco.annotations[2].category_id, 1);
        assert_eq!(coco.annotations[2].image_id, 2);
    }

    #[test]
    fn test_convert_extended_keep_original() {
        let dir = fixture();
        let root = dir.path();
        let opts = ConvertOptions::extended("mass.csv", 0.2, true);
        assert_eq!(opts.out_file, "annotation_coco_with_classes_extend_bbox_0.2_aug.json");
        let table = AnnotationTable::from_path(root.join("mass.csv")).unwrap();
        let (coco, _, _) = build_coco(root, &table, mass_categories(), &opts).unwrap();
        assert_eq!(coco.annotations.len(), 6);

        let (orig, ext) = (&coco.annotations[0], &coco.annotations[1]);
        assert_eq!((orig.id, ext.id), (0, 1));
        assert_eq!(orig.bbox, [5.5, 10.5, 9.0, 9.0]);
        let [x, y, w, h] = ext.bbox;
        assert!((x - 3.7).abs() < 1e-9 && (y - 8.7).abs() < 1e-9);
        assert!((w - 12.6).abs() < 1e-9 && (h - 12.6).abs() < 1e-9);

        // 左上角贴边的病灶: 左边和上边不动.
        let corner = &coco.annotations[3];
        assert_eq!(&corner.bbox[..2], [0.5, 0.5]);
        assert!((corner.bbox[2] - 10.8).abs() < 1e-9);

        // 右下角贴边的病灶: 右边和下边不动, 且仍在图像内.
        let corner = &coco.annotations[5];
        assert!((corner.bbox[0] + corner.bbox[2] - 29.5).abs() < 1e-9);
        assert!((corner.bbox[1] + corner.bbox[3] - 39.5).abs() < 1e-9);
        assert!((corner.bbox[0] - 18.7).abs() < 1e-9);
    }

    #[test]
    fn test_convert_is_idempotent_by_presence() {
        let dir = fixture();
        let root = dir.path();
        let opts = ConvertOptions::tight("mass.csv");
        convert_cbis_to_coco(root, mass_categories(), &opts).unwrap();
        let out = root.join(COCO_OUT_FILE);
        let before = fs::read(&out).unwrap();

        let again = convert_cbis_to_coco(root, mass_categories(), &opts).unwrap();
        assert_eq!(again, ConvertOutcome::AlreadyExists(out.clone()));
        assert_eq!(fs::read(&out).unwrap(), before);
    }

    #[test]
    fn test_unknown_pathology_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(
            root.join("calc.csv"),
            "patient_id,left or right breast,image view,abnormality id,pathology\n\
             P_00008,LEFT,CC,1,UNKNOWN\n",
        )
        .unwrap();
        make_case(
            root,
            "Calc-Test_P_00008_LEFT_CC",
            (8, 8),
            &[rect_mask((8, 8), (2, 5), (2, 5))],
        );
        let err = convert_cbis_to_coco(root, mass_categories(), &ConvertOptions::tight("calc.csv"))
            .unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Match(MatchError::UnknownPathology { .. })
        ));
        assert!(!root.join(COCO_OUT_FILE).exists());
    }
}
