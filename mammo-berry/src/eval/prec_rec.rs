//! 贪心一对一匹配下的 PR 曲线与 FROC 曲线.

use super::{center_inside, iou, DetectionBox, EvalError, ScoredBox};
use ordered_float::OrderedFloat;
use std::fmt;

/// 中心点规则下, 多个未匹配真值框都包含预测框中心时选哪一个.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CenterTieBreak {
    /// 枚举顺序中的最后一个.
    #[default]
    LastCandidate,

    /// 与预测框 IoU 最大者, 与 IoU 规则一致.
    BestOverlap,
}

/// 预测框与真值框的匹配规则.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum MatchRule {
    /// IoU 不低于阈值, 取 IoU 最大的未匹配真值框.
    Iou(f64),

    /// 预测框中心严格位于真值框内.
    Center(CenterTieBreak),
}

impl MatchRule {
    /// 常用的四种规则: IoU 0.75, 0.5, 0.25, 以及中心点.
    pub const STANDARD: [MatchRule; 4] = [
        MatchRule::Iou(0.75),
        MatchRule::Iou(0.5),
        MatchRule::Iou(0.25),
        MatchRule::Center(CenterTieBreak::LastCandidate),
    ];

    /// 在 `gts` 中为 `pred` 选择一个未匹配的真值框.
    fn select(&self, pred: &DetectionBox, gts: &[DetectionBox], matched: &[bool]) -> Option<usize> {
        let candidates = gts
            .iter()
            .zip(matched)
            .enumerate()
            .filter(|(_, (_, m))| !**m)
            .map(|(i, (gt, _))| (i, gt));

        let mut best: Option<(usize, f64)> = None;
        match *self {
            Self::Iou(thres) => {
                for (i, gt) in candidates {
                    let v = iou(pred, gt);
                    if v >= thres && best.map_or(true, |(_, b)| v > b) {
                        best = Some((i, v));
                    }
                }
            }
            Self::Center(CenterTieBreak::LastCandidate) => {
                return candidates.filter(|(_, gt)| center_inside(pred, gt)).last().map(|(i, _)| i);
            }
            Self::Center(CenterTieBreak::BestOverlap) => {
                for (i, gt) in candidates.filter(|(_, gt)| center_inside(pred, gt)) {
                    let v = iou(pred, gt);
                    if best.map_or(true, |(_, b)| v > b) {
                        best = Some((i, v));
                    }
                }
            }
        }
        best.map(|(i, _)| i)
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Iou(t) => write!(f, "IoU={t}"),
            Self::Center(_) => f.write_str("center"),
        }
    }
}

/// 一条 PR / FROC 曲线. 每个预测框 (按置信度从高到低) 对应一个点.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrCurve {
    /// 插值后的精确率, 从后往前单调不减.
    pub precision: Vec<f64>,

    /// 召回率 (即灵敏度), 单调不减.
    pub recall: Vec<f64>,

    /// 插值后的每图像假阳性数, 从后往前单调不增.
    pub fp_per_image: Vec<f64>,

    /// 真阳性总数.
    pub true_positives: usize,

    /// 假阳性总数.
    pub false_positives: usize,

    /// 平均精度, 保留两位小数.
    pub average_precision: f64,
}

impl PrCurve {
    /// 曲线点数.
    #[inline]
    pub fn len(&self) -> usize {
        self.precision.len()
    }

    /// 是否没有任何预测框?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.precision.is_empty()
    }
}

/// 计算一个类别的 PR 曲线.
///
/// `gt[i]` 与 `preds[i]` 为同一张图像的真值框与预测框. 所有预测框按置信度降序
/// (相同置信度保持枚举顺序) 依次与同图像中尚未匹配的真值框贪心匹配, 每个真值框至多匹配一次.
///
/// 遍历结束后, 精确率替换为其后缀最大值, 每图像假阳性数替换为其后缀最小值.
/// AP 为 `Σ (recall[i] - recall[i-1]) × precision[i]` (其中 `recall[-1] = 0`), 四舍五入到两位小数.
/// 没有真值框时召回率恒为 0.
pub fn precision_recall(
    gt: &[Vec<DetectionBox>],
    preds: &[Vec<ScoredBox>],
    rule: MatchRule,
) -> Result<PrCurve, EvalError> {
    if gt.len() != preds.len() {
        return Err(EvalError::LengthMismatch {
            gt: gt.len(),
            preds: preds.len(),
        });
    }
    if let MatchRule::Iou(t) = rule {
        if !(0.0..=1.0).contains(&t) {
            return Err(EvalError::Threshold(t));
        }
    }

    let mut order: Vec<(usize, &ScoredBox)> = preds
        .iter()
        .enumerate()
        .flat_map(|(img, boxes)| boxes.iter().map(move |b| (img, b)))
        .collect();
    order.sort_by_key(|(_, b)| std::cmp::Reverse(OrderedFloat(b.score)));

    let total_pos: usize = gt.iter().map(Vec::len).sum();
    log::debug!("#Pred boxes: {}, #Gt boxes: {total_pos}", order.len());

    let mut matched: Vec<Vec<bool>> = gt.iter().map(|g| vec![false; g.len()]).collect();
    let mut seen = vec![false; gt.len()];
    let mut n_seen = 0usize;
    let (mut tp, mut fp) = (0usize, 0usize);

    let mut ans = PrCurve {
        precision: Vec::with_capacity(order.len()),
        recall: Vec::with_capacity(order.len()),
        fp_per_image: Vec::with_capacity(order.len()),
        ..Default::default()
    };
    for (img, pred) in order {
        match rule.select(&pred.bbox, &gt[img], &matched[img]) {
            Some(k) => {
                matched[img][k] = true;
                tp += 1;
            }
            None => fp += 1,
        }
        if !seen[img] {
            seen[img] = true;
            n_seen += 1;
        }
        ans.precision.push(tp as f64 / (tp + fp) as f64);
        ans.recall.push(if total_pos == 0 {
            0.0
        } else {
            tp as f64 / total_pos as f64
        });
        ans.fp_per_image.push(fp as f64 / n_seen as f64);
    }

    for i in (0..ans.len().saturating_sub(1)).rev() {
        ans.precision[i] = ans.precision[i].max(ans.precision[i + 1]);
        ans.fp_per_image[i] = ans.fp_per_image[i].min(ans.fp_per_image[i + 1]);
    }

    let mut prev = 0.0;
    let mut ap = 0.0;
    for (&r, &p) in ans.recall.iter().zip(ans.precision.iter()) {
        ap += (r - prev) * p;
        prev = r;
    }
    ans.true_positives = tp;
    ans.false_positives = fp;
    ans.average_precision = (ap * 100.0).round() / 100.0;
    log::debug!("{rule}: Average Precision: {}", ans.average_precision);
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(l: f64, t: f64, r: f64, bt: f64) -> DetectionBox {
        DetectionBox::new(l, t, r, bt)
    }

    #[test]
    fn test_basic_iou_curve() {
        let gt = vec![vec![b(0.0, 0.0, 10.0, 10.0)]];
        let preds = vec![vec![
            ScoredBox::new(100.0, 100.0, 110.0, 110.0, 0.5),
            ScoredBox::new(0.0, 0.0, 10.0, 10.0, 0.9),
        ]];
        let c = precision_recall(&gt, &preds, MatchRule::Iou(0.5)).unwrap();
        assert_eq!((c.true_positives, c.false_positives), (1, 1));
        assert_eq!(c.recall, [1.0, 1.0]);
        assert_eq!(c.precision, [1.0, 0.5]);
        assert_eq!(c.fp_per_image, [0.0, 1.0]);
        assert_eq!(*c.recall.last().unwrap(), 1.0);
        assert!(c.average_precision > 0.0);
        assert_eq!(c.average_precision, 1.0);
    }

    #[test]
    fn test_envelope_is_suffix_max() {
        // 命中, 未命中, 命中, 未命中, 命中.
        let gt = vec![
            vec![b(0.0, 0.0, 9.0, 9.0), b(50.0, 50.0, 59.0, 59.0)],
            vec![b(0.0, 0.0, 9.0, 9.0)],
        ];
        let preds = vec![
            vec![
                ScoredBox::new(0.0, 0.0, 9.0, 9.0, 0.9),
                ScoredBox::new(200.0, 200.0, 209.0, 209.0, 0.8),
                ScoredBox::new(50.0, 50.0, 59.0, 59.0, 0.7),
            ],
            vec![
                ScoredBox::new(300.0, 0.0, 309.0, 9.0, 0.6),
                ScoredBox::new(1.0, 1.0, 9.0, 9.0, 0.5),
            ],
        ];
        let c = precision_recall(&gt, &preds, MatchRule::Iou(0.5)).unwrap();
        assert_eq!(c.true_positives, 3);
        for i in 0..c.len() {
            let suffix_max = c.precision[i..].iter().copied().fold(f64::MIN, f64::max);
            assert_eq!(c.precision[i], suffix_max);
            let suffix_min = c.fp_per_image[i..].iter().copied().fold(f64::MAX, f64::min);
            assert_eq!(c.fp_per_image[i], suffix_min);
        }
        assert!(c.recall.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(c.precision[1], 2.0 / 3.0);
        // 原始 fp/img: 0, 1/1, 1/1, 2/2, 2/2.
        assert_eq!(c.fp_per_image, [0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_ap_invariant_to_trailing_fp() {
        let gt = vec![vec![b(0.0, 0.0, 10.0, 10.0)], vec![b(20.0, 20.0, 40.0, 40.0)]];
        let mut preds = vec![
            vec![ScoredBox::new(0.0, 0.0, 10.0, 10.0, 0.9)],
            vec![
                ScoredBox::new(60.0, 60.0, 80.0, 80.0, 0.8),
                ScoredBox::new(21.0, 21.0, 40.0, 40.0, 0.7),
            ],
        ];
        let before = precision_recall(&gt, &preds, MatchRule::Iou(0.5)).unwrap();
        preds[0].push(ScoredBox::new(500.0, 500.0, 510.0, 510.0, 0.01));
        let after = precision_recall(&gt, &preds, MatchRule::Iou(0.5)).unwrap();
        assert_eq!(after.false_positives, before.false_positives + 1);
        assert_eq!(before.average_precision, after.average_precision);
    }

    #[test]
    fn test_one_to_one() {
        // 低置信度的预测框即使 IoU 更高也不能抢走已匹配的真值框.
        let gt = vec![vec![b(0.0, 0.0, 9.0, 9.0)]];
        let preds = vec![vec![
            ScoredBox::new(1.0, 0.0, 9.0, 9.0, 0.9),
            ScoredBox::new(0.0, 0.0, 9.0, 9.0, 0.8),
        ]];
        let c = precision_recall(&gt, &preds, MatchRule::Iou(0.5)).unwrap();
        assert_eq!((c.true_positives, c.false_positives), (1, 1));
    }

    #[test]
    fn test_iou_picks_max_overlap() {
        let gt = vec![vec![b(0.0, 0.0, 9.0, 9.0), b(2.0, 0.0, 11.0, 9.0)]];
        let preds = vec![vec![
            ScoredBox::new(2.0, 0.0, 11.0, 9.0, 0.9),
            ScoredBox::new(-3.0, 0.0, 6.0, 9.0, 0.8),
        ]];
        // 第一个预测框与两个真值框的 IoU 分别为 2/3 和 1, 应取后者.
        // 第二个预测框只与第一个真值框的 IoU 超过阈值 (7/13).
        let c = precision_recall(&gt, &preds, MatchRule::Iou(0.5)).unwrap();
        assert_eq!(c.true_positives, 2);
    }

    #[test]
    fn test_center_tie_break() {
        // 两个真值框都包含预测框中心 (5, 5).
        let gt = vec![vec![b(0.0, 0.0, 10.0, 10.0), b(3.0, 3.0, 30.0, 30.0)]];
        let p = ScoredBox::new(0.0, 0.0, 10.0, 10.0, 0.9);
        let q = ScoredBox::new(0.0, 0.0, 10.0, 10.0, 0.8);
        let preds = vec![vec![p, q]];

        let best = precision_recall(&gt, &preds, MatchRule::Center(CenterTieBreak::BestOverlap)).unwrap();
        let last = precision_recall(&gt, &preds, MatchRule::Center(CenterTieBreak::LastCandidate)).unwrap();
        // 无论先选哪个, 第二个预测框都能命中剩下那个.
        assert_eq!(best.true_positives, 2);
        assert_eq!(last.true_positives, 2);

        let gt_first = MatchRule::Center(CenterTieBreak::BestOverlap).select(&p.bbox, &gt[0], &[false, false]);
        let gt_last = MatchRule::Center(CenterTieBreak::LastCandidate).select(&p.bbox, &gt[0], &[false, false]);
        assert_eq!(gt_first, Some(0));
        assert_eq!(gt_last, Some(1));
        assert_eq!(
            MatchRule::Center(CenterTieBreak::LastCandidate).select(&p.bbox, &gt[0], &[false, true]),
            Some(0)
        );

        // 缺省按枚举顺序取最后一个候选.
        assert_eq!(CenterTieBreak::default(), CenterTieBreak::LastCandidate);
        assert_eq!(MatchRule::STANDARD[3], MatchRule::Center(CenterTieBreak::LastCandidate));
    }

    #[test]
    fn test_edge_cases() {
        let gt = vec![vec![b(0.0, 0.0, 10.0, 10.0)], vec![]];
        let c = precision_recall(&gt, &[vec![], vec![]], MatchRule::Iou(0.5)).unwrap();
        assert!(c.is_empty());
        assert_eq!(c.average_precision, 0.0);

        assert!(matches!(
            precision_recall(&gt, &[vec![]], MatchRule::Iou(0.5)),
            Err(EvalError::LengthMismatch { gt: 2, preds: 1 })
        ));
        assert!(matches!(
            precision_recall(&gt, &[vec![], vec![]], MatchRule::Iou(1.5)),
            Err(EvalError::Threshold(t)) if t == 1.5
        ));
    }

    #[test]
    fn test_display() {
        let names: Vec<String> = MatchRule::STANDARD.iter().map(|r| r.to_string()).collect();
        assert_eq!(names, ["IoU=0.75", "IoU=0.5", "IoU=0.25", "center"]);
    }
}
