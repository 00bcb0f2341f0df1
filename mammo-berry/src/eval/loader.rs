//! 从 COCO 真值与检测结果 JSON 中读取某个类别的逐图像框列表.

use super::{DetectionBox, EvalError, ScoredBox};
use crate::coco::{read_json, CocoDataset, Detection};
use itertools::Itertools;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// 预测框的选取方式.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum BoxSelect {
    /// 所有预测框.
    #[default]
    All,

    /// 每张图像只取置信度最高的一个.
    #[value(name = "opi")]
    OnePerImage,
}

impl FromStr for BoxSelect {
    type Err = EvalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all" => Ok(Self::All),
            "opi" => Ok(Self::OnePerImage),
            _ => Err(EvalError::BoxSelect(s.to_owned())),
        }
    }
}

impl fmt::Display for BoxSelect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::All => "all",
            Self::OnePerImage => "opi",
        })
    }
}

/// 某个类别的逐图像真值框与预测框, 按真值 JSON 中的图像顺序排列.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BoxLists {
    /// 真值框.
    pub gt: Vec<Vec<DetectionBox>>,

    /// 预测框.
    pub preds: Vec<Vec<ScoredBox>>,
}

impl BoxLists {
    /// 由内存中的数据构建.
    ///
    /// 不属于任何真值图像的预测框被忽略. `OnePerImage` 时只保留置信度严格大于 0
    /// 且最高的预测框, 置信度相同时取先出现者.
    pub fn build(gt: &CocoDataset, dets: &[Detection], category_id: u32, select: BoxSelect) -> Self {
        let mut gt_map = gt
            .annotations
            .iter()
            .filter(|a| a.category_id == category_id)
            .into_group_map_by(|a| a.image_id);
        let mut det_map = dets
            .iter()
            .filter(|d| d.category_id == category_id)
            .into_group_map_by(|d| d.image_id);

        let mut ans = Self {
            gt: Vec::with_capacity(gt.images.len()),
            preds: Vec::with_capacity(gt.images.len()),
        };
        for img in gt.images.iter() {
            let boxes = gt_map.remove(&img.id).unwrap_or_default();
            ans.gt.push(boxes.into_iter().map(|a| DetectionBox::from_xywh(a.bbox)).collect());

            let dets = det_map.remove(&img.id).unwrap_or_default();
            let scored = dets.into_iter().map(|d| ScoredBox {
                bbox: DetectionBox::from_xywh(d.bbox),
                score: d.score,
            });
            ans.preds.push(match select {
                BoxSelect::All => scored.collect(),
                BoxSelect::OnePerImage => {
                    let mut best: Option<ScoredBox> = None;
                    for b in scored {
                        if b.score > best.map_or(0.0, |x| x.score) {
                            best = Some(b);
                        }
                    }
                    best.into_iter().collect()
                }
            });
        }
        log::info!(
            "#test images: {}, category {category_id}: {} gt, {} pred ({select})",
            ans.gt.len(),
            ans.gt.iter().map(Vec::len).sum::<usize>(),
            ans.preds.iter().map(Vec::len).sum::<usize>()
        );
        ans
    }
}

/// 读取真值 COCO JSON 与检测结果 JSON, 构建 `category_id` 的框列表.
pub fn load_box_lists<P: AsRef<Path>, Q: AsRef<Path>>(
    gt_json: P,
    det_json: Q,
    category_id: u32,
    select: BoxSelect,
) -> Result<BoxLists, EvalError> {
    let gt = CocoDataset::from_path(gt_json)?;
    let dets: Vec<Detection> = read_json(det_json)?;
    Ok(BoxLists::build(&gt, &dets, category_id, select))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::coco::{mass_categories, write_json, CocoAnnotation, CocoImage};

    pub(crate) fn image(id: u64) -> CocoImage {
        CocoImage {
            id,
            file_name: format!("{id}.png"),
            height: 100,
            width: 100,
        }
    }

    pub(crate) fn ann(id: u64, image_id: u64, category_id: u32, bbox: [f64; 4]) -> CocoAnnotation {
        CocoAnnotation {
            id,
            image_id,
            category_id,
            bbox,
            area: bbox[2] * bbox[3],
            segmentation: vec![],
            iscrowd: 0,
        }
    }

    pub(crate) fn det(image_id: u64, category_id: u32, bbox: [f64; 4], score: f64) -> Detection {
        Detection {
            image_id,
            category_id,
            bbox,
            score,
        }
    }

    /// 两张图像; 图像 7 有一个恶性真值, 图像 2 有一个良性真值.
    pub(crate) fn sample() -> (CocoDataset, Vec<Detection>) {
        let gt = CocoDataset {
            images: vec![image(7), image(2)],
            annotations: vec![
                ann(0, 7, 0, [0.0, 0.0, 11.0, 11.0]),
                ann(1, 2, 1, [20.0, 20.0, 10.0, 10.0]),
            ],
            categories: mass_categories(),
        };
        let dets = vec![
            det(7, 0, [0.0, 0.0, 11.0, 11.0], 0.9),
            det(7, 0, [100.0, 100.0, 11.0, 11.0], 0.5),
            det(7, 0, [40.0, 40.0, 5.0, 5.0], 0.95),
            det(2, 1, [20.0, 20.0, 10.0, 10.0], 0.8),
            det(2, 0, [50.0, 50.0, 10.0, 10.0], 0.0),
            det(99, 0, [0.0, 0.0, 1.0, 1.0], 1.0),
        ];
        (gt, dets)
    }

    #[test]
    fn test_build_all() {
        let (gt, dets) = sample();
        let lists = BoxLists::build(&gt, &dets, 0, BoxSelect::All);
        assert_eq!(lists.gt, [vec![DetectionBox::new(0.0, 0.0, 10.0, 10.0)], vec![]]);
        assert_eq!(lists.preds[0].len(), 3);
        assert_eq!(lists.preds[0][0], ScoredBox::new(0.0, 0.0, 10.0, 10.0, 0.9));
        assert_eq!(lists.preds[1].len(), 1);
    }

    #[test]
    fn test_build_one_per_image() {
        let (gt, dets) = sample();
        let lists = BoxLists::build(&gt, &dets, 0, BoxSelect::OnePerImage);
        assert_eq!(lists.preds[0], [ScoredBox::new(40.0, 40.0, 44.0, 44.0, 0.95)]);
        // 置信度为 0 的预测框永远不会被选中.
        assert!(lists.preds[1].is_empty());
    }

    #[test]
    fn test_load_box_lists() {
        let (gt, dets) = sample();
        let dir = tempfile::tempdir().unwrap();
        let (gt_path, det_path) = (dir.path().join("gt.json"), dir.path().join("det.json"));
        gt.save(&gt_path).unwrap();
        write_json(&dets, &det_path).unwrap();
        let lists = load_box_lists(&gt_path, &det_path, 1, BoxSelect::All).unwrap();
        assert_eq!(lists.gt[1], [DetectionBox::new(20.0, 20.0, 29.0, 29.0)]);
        assert_eq!(lists.preds[1].len(), 1);
        assert!(lists.preds[0].is_empty());
    }

    #[test]
    fn test_box_select_parse() {
        assert_eq!("opi".parse::<BoxSelect>().unwrap(), BoxSelect::OnePerImage);
        assert_eq!(BoxSelect::All.to_string(), "all");
        assert!("best".parse::<BoxSelect>().is_err());
    }
}
