//! 检测与分类结果评估.
//!
//! 检测评估对每个类别单独进行: 先按图像整理真值框与预测框 ([`load_box_lists`]),
//! 再按不同的匹配规则计算 PR 曲线, FROC 曲线和 AP ([`precision_recall`]).
//!
//! 所有框都是两端包含的像素坐标, 宽高按 `+1` 计算.

use crate::coco::JsonError;
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

mod confusion;
mod geometry;
mod loader;
mod prec_rec;

pub use confusion::ConfusionMatrix;
pub use geometry::{center_inside, iou, DetectionBox, ScoredBox};
pub use loader::{load_box_lists, BoxLists, BoxSelect};
pub use prec_rec::{precision_recall, CenterTieBreak, MatchRule, PrCurve};

/// 评估错误.
#[derive(Debug, Error)]
pub enum EvalError {
    /// 真值与预测的图像数 (或样本数) 不一致.
    #[error("真值有 {gt} 项, 预测有 {preds} 项")]
    LengthMismatch {
        /// 真值项数.
        gt: usize,
        /// 预测项数.
        preds: usize,
    },

    /// IoU 阈值不在 `[0, 1]` 内.
    #[error("IoU 阈值 {0} 不在 [0, 1] 内")]
    Threshold(f64),

    /// 类别编号越界.
    #[error("类别 {0} 超出类别数 {1}")]
    Class(usize, usize),

    /// 无法识别的预测框选取方式.
    #[error("未知的预测框选取方式 `{0}`, 应为 `all` 或 `opi`")]
    BoxSelect(String),

    /// 读取 JSON 错误.
    #[error(transparent)]
    Json(#[from] JsonError),

    /// 写曲线错误.
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// 一个类别在所有标准规则下的评估结果.
#[derive(Clone, Debug, PartialEq)]
pub struct CategoryReport {
    /// 类别编号.
    pub category_id: u32,

    /// 类别名.
    pub category_name: String,

    /// 与 [`MatchRule::STANDARD`] 一一对应的曲线.
    pub curves: Vec<(MatchRule, PrCurve)>,
}

impl CategoryReport {
    /// 各规则下的 AP.
    pub fn aps(&self) -> Vec<f64> {
        self.curves.iter().map(|(_, c)| c.average_precision).collect()
    }
}

/// 在 IoU 0.75, 0.5, 0.25 以及中心点规则下评估一个类别.
///
/// 中心点规则的多候选选择方式由 `tie_break` 决定.
pub fn evaluate_category(
    lists: &BoxLists,
    category_id: u32,
    category_name: &str,
    tie_break: CenterTieBreak,
) -> Result<CategoryReport, EvalError> {
    let mut curves = Vec::with_capacity(MatchRule::STANDARD.len());
    for rule in MatchRule::STANDARD {
        let rule = match rule {
            MatchRule::Center(_) => MatchRule::Center(tie_break),
            r => r,
        };
        let curve = precision_recall(&lists.gt, &lists.preds, rule)?;
        log::info!("{category_name} {rule}: AP = {}", curve.average_precision);
        curves.push((rule, curve));
    }
    Ok(CategoryReport {
        category_id,
        category_name: category_name.to_owned(),
        curves,
    })
}

/// 各规则下 AP 在所有类别上的平均值. 没有类别时为空.
pub fn mean_aps(reports: &[CategoryReport]) -> Vec<f64> {
    let Some(first) = reports.first() else {
        return Vec::new();
    };
    (0..first.curves.len())
        .map(|k| reports.iter().map(|r| r.curves[k].1.average_precision).sum::<f64>() / reports.len() as f64)
        .collect()
}

#[derive(Serialize)]
struct CurveRow<'a> {
    category: &'a str,
    rule: String,
    rank: usize,
    recall: f64,
    precision: f64,
    fp_per_image: f64,
}

/// 将报告中的所有曲线写为一个 CSV 文件, 每行为曲线上的一个点.
///
/// 列为 `category, rule, rank, recall, precision, fp_per_image`.
/// 以 `recall` 为横轴, `precision` 为纵轴即为 PR 曲线; 以 `fp_per_image` 为横轴,
/// `recall` 为纵轴即为 FROC 曲线.
pub fn write_curves_csv<P: AsRef<Path>>(path: P, report: &CategoryReport) -> Result<(), EvalError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for (rule, curve) in report.curves.iter() {
        let rule = rule.to_string();
        for rank in 0..curve.len() {
            wtr.serialize(CurveRow {
                category: &report.category_name,
                rule: rule.clone(),
                rank,
                recall: curve.recall[rank],
                precision: curve.precision[rank],
                fp_per_image: curve.fp_per_image[rank],
            })?;
        }
    }
    wtr.flush().map_err(csv::Error::from)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use loader::tests::sample;

    #[test]
    fn test_evaluate_and_write() {
        let (gt, dets) = sample();
        let lists = BoxLists::build(&gt, &dets, 0, BoxSelect::All);
        let report = evaluate_category(&lists, 0, "malignant", CenterTieBreak::LastCandidate).unwrap();
        assert_eq!(report.curves.len(), 4);
        assert_eq!(report.curves[3].0, MatchRule::Center(CenterTieBreak::LastCandidate));
        for (_, c) in report.curves.iter() {
            assert_eq!(c.len(), 4);
            assert_eq!(c.true_positives, 1);
        }
        // 置信度顺序: 0.95 (假阳性), 0.9 (命中), 0.5, 0.0.
        assert_eq!(report.aps(), [0.5; 4]);
        assert_eq!(mean_aps(&[report.clone(), report.clone()]), [0.5; 4]);
        assert!(mean_aps(&[]).is_empty());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curves.csv");
        write_curves_csv(&path, &report).unwrap();
        let mut rdr = csv::Reader::from_path(&path).unwrap();
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            ["category", "rule", "rank", "recall", "precision", "fp_per_image"]
        );
        let rows: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 16);
        assert_eq!(&rows[0][1], "IoU=0.75");
        assert_eq!(&rows[15][1], "center");
    }
}
