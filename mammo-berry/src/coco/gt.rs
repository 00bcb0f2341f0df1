//! 将 COCO 标注导出为逐图像的检测真值文本.

use super::CocoDataset;
use std::fmt::Write as _;
use std::fs;
use std::io;
use std::path::Path;

/// 为每张图像在 `out_dir` 下写出 `<图像名>.txt`, 每行为 `类别名 x y w h`.
///
/// 已存在的文件不会被覆盖. 返回新写出的文件数.
pub fn export_detection_gt<P: AsRef<Path>>(coco: &CocoDataset, out_dir: P) -> io::Result<usize> {
    let out_dir = out_dir.as_ref();
    fs::create_dir_all(out_dir)?;
    let mut written = 0;
    for img in coco.images.iter() {
        let stem = Path::new(&img.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&img.file_name);
        let path = out_dir.join(format!("{stem}.txt"));
        if path.exists() {
            continue;
        }

        let mut buf = String::new();
        let mut count = 0;
        for ann in coco.annotations_of(img.id) {
            let Some(name) = coco.category_name(ann.category_id) else {
                log::warn!("标注 {} 的类别 {} 不存在", ann.id, ann.category_id);
                continue;
            };
            let [x, y, w, h] = ann.bbox;
            // 写入 String 不会失败.
            let _ = writeln!(buf, "{name} {x} {y} {w} {h}");
            count += 1;
        }
        log::debug!("{} {count}", img.file_name);
        fs::write(&path, buf)?;
        written += 1;
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coco::{mass_categories, CocoAnnotation, CocoImage};

    #[test]
    fn test_export_detection_gt() {
        let coco = CocoDataset {
            images: vec![CocoImage {
                id: 3,
                file_name: "case_a/case_a.png".into(),
                height: 10,
                width: 10,
            }],
            annotations: vec![
                CocoAnnotation {
                    id: 0,
                    image_id: 3,
                    category_id: 1,
                    bbox: [1.5, 2.5, 3.0, 4.0],
                    area: 12.0,
                    segmentation: vec![],
                    iscrowd: 0,
                },
                CocoAnnotation {
                    id: 1,
                    image_id: 4,
                    category_id: 0,
                    bbox: [0.0, 0.0, 1.0, 1.0],
                    area: 1.0,
                    segmentation: vec![],
                    iscrowd: 0,
                },
            ],
            categories: mass_categories(),
        };
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(export_detection_gt(&coco, dir.path()).unwrap(), 1);
        let text = fs::read_to_string(dir.path().join("case_a.txt")).unwrap();
        assert_eq!(text, "benign-mass 1.5 2.5 3 4\n");
        assert_eq!(export_detection_gt(&coco, dir.path()).unwrap(), 0);
    }
}
