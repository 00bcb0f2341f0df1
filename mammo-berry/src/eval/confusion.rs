//! 分类结果的混淆矩阵.

use super::EvalError;
use ndarray::Array2;
use std::fmt;

/// `n × n` 混淆矩阵, 行为真实类别, 列为预测类别.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfusionMatrix {
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    /// 由真实类别与预测类别序列统计. 两者长度必须相同, 且所有类别都小于 `n_classes`.
    pub fn from_predictions(truth: &[usize], pred: &[usize], n_classes: usize) -> Result<Self, EvalError> {
        if truth.len() != pred.len() {
            return Err(EvalError::LengthMismatch {
                gt: truth.len(),
                preds: pred.len(),
            });
        }
        let mut counts = Array2::zeros((n_classes, n_classes));
        for (&t, &p) in truth.iter().zip(pred) {
            let c = t.max(p);
            if c >= n_classes {
                return Err(EvalError::Class(c, n_classes));
            }
            counts[(t, p)] += 1;
        }
        Ok(Self { counts })
    }

    /// 类别数.
    #[inline]
    pub fn n_classes(&self) -> usize {
        self.counts.nrows()
    }

    /// 真实类别为 `truth` 且预测为 `pred` 的样本数.
    #[inline]
    pub fn count(&self, truth: usize, pred: usize) -> usize {
        self.counts[(truth, pred)]
    }

    /// 样本总数.
    #[inline]
    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    /// 准确率. 没有样本时为 `None`.
    pub fn accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.counts.diag().sum() as f64 / total as f64)
    }

    /// 类别 `c` 的召回率. 该类别没有样本时为 `None`.
    pub fn recall(&self, c: usize) -> Option<f64> {
        let n = self.counts.row(c).sum();
        (n > 0).then(|| self.counts[(c, c)] as f64 / n as f64)
    }

    /// 类别 `c` 的精确率. 没有样本被预测为该类别时为 `None`.
    pub fn precision(&self, c: usize) -> Option<f64> {
        let n = self.counts.column(c).sum();
        (n > 0).then(|| self.counts[(c, c)] as f64 / n as f64)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.counts.rows() {
            let line: Vec<String> = row.iter().map(|v| format!("{v:>6}")).collect();
            writeln!(f, "{}", line.join(""))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confusion_matrix() {
        let truth = [0, 0, 1, 1, 1, 2];
        let pred = [0, 1, 1, 1, 0, 1];
        let m = ConfusionMatrix::from_predictions(&truth, &pred, 3).unwrap();
        assert_eq!(m.n_classes(), 3);
        assert_eq!(m.count(1, 1), 2);
        assert_eq!(m.count(2, 1), 1);
        assert_eq!(m.total(), 6);
        assert_eq!(m.accuracy(), Some(0.5));
        assert_eq!(m.recall(0), Some(0.5));
        assert_eq!(m.precision(1), Some(0.5));
        assert_eq!(m.precision(2), None);
        assert_eq!(m.to_string().lines().count(), 3);
    }

    #[test]
    fn test_confusion_errors() {
        assert!(matches!(
            ConfusionMatrix::from_predictions(&[0, 3], &[0, 0], 3),
            Err(EvalError::Class(3, 3))
        ));
        assert!(ConfusionMatrix::from_predictions(&[0], &[], 2).is_err());
        let empty = ConfusionMatrix::from_predictions(&[], &[], 2).unwrap();
        assert_eq!(empty.accuracy(), None);
    }
}
