//! 检测框几何. 所有框两端均包含, 宽高按 `+1` 计.

use serde::{Deserialize, Serialize};

/// 轴对齐检测框 `(left, top, right, bottom)`, 像素坐标, 两端均包含.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionBox {
    /// 左.
    pub left: f64,
    /// 上.
    pub top: f64,
    /// 右 (含).
    pub right: f64,
    /// 下 (含).
    pub bottom: f64,
}

impl DetectionBox {
    /// 直接构造.
    #[inline]
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// 由 COCO 的 `[x, y, w, h]` 构造: `right = x + w - 1`, `bottom = y + h - 1`.
    #[inline]
    pub fn from_xywh([x, y, w, h]: [f64; 4]) -> Self {
        Self::new(x, y, x + w - 1.0, y + h - 1.0)
    }

    /// 像素面积. 退化的框面积为 0.
    #[inline]
    pub fn area(&self) -> f64 {
        (self.right - self.left + 1.0).max(0.0) * (self.bottom - self.top + 1.0).max(0.0)
    }

    /// 中心 `(x, y)`.
    #[inline]
    pub fn center(&self) -> (f64, f64) {
        ((self.left + self.right) / 2.0, (self.top + self.bottom) / 2.0)
    }

    /// 点 `(x, y)` 是否严格位于框内 (不含边界)?
    #[inline]
    pub fn strictly_contains(&self, (x, y): (f64, f64)) -> bool {
        x > self.left && x < self.right && y > self.top && y < self.bottom
    }
}

/// 带置信度的预测框.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScoredBox {
    /// 几何.
    pub bbox: DetectionBox,
    /// 置信度.
    pub score: f64,
}

impl ScoredBox {
    /// 直接构造.
    #[inline]
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64, score: f64) -> Self {
        Self {
            bbox: DetectionBox::new(left, top, right, bottom),
            score,
        }
    }
}

/// 交并比. 没有交集时为 0, 两个框都退化时也为 0.
pub fn iou(a: &DetectionBox, b: &DetectionBox) -> f64 {
    let inter = DetectionBox::new(
        a.left.max(b.left),
        a.top.max(b.top),
        a.right.min(b.right),
        a.bottom.min(b.bottom),
    )
    .area();
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}

/// 预测框 `pred` 的中心是否严格位于真值框 `gt` 内?
#[inline]
pub fn center_inside(pred: &DetectionBox, gt: &DetectionBox) -> bool {
    gt.strictly_contains(pred.center())
}
