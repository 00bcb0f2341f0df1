use crate::consts::POLYGON_PIXEL_OFFSET;
use crate::Idx2d;

/// 连续坐标下的轴对齐包围框 `(x_min, y_min, x_max, y_max)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    /// 左.
    pub x_min: f64,
    /// 上.
    pub y_min: f64,
    /// 右.
    pub x_max: f64,
    /// 下.
    pub y_max: f64,
}

impl BBox {
    /// 所有多边形顶点的紧致包围框. 没有任何顶点时返回 `None`.
    pub fn from_polygons(polygons: &[Vec<f64>]) -> Option<Self> {
        let mut points = polygons.iter().flat_map(|p| p.chunks_exact(2));
        let first = points.next()?;
        let init = Self {
            x_min: first[0],
            y_min: first[1],
            x_max: first[0],
            y_max: first[1],
        };
        Some(points.fold(init, |b, p| Self {
            x_min: b.x_min.min(p[0]),
            y_min: b.y_min.min(p[1]),
            x_max: b.x_max.max(p[0]),
            y_max: b.y_max.max(p[1]),
        }))
    }

    /// 宽.
    #[inline]
    pub fn width(&self) -> f64 {
        self.x_max - self.x_min
    }

    /// 高.
    #[inline]
    pub fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// COCO 的 `[x, y, w, h]`.
    #[inline]
    pub fn to_xywh(&self) -> [f64; 4] {
        [self.x_min, self.y_min, self.width(), self.height()]
    }

    /// 是否完全包含 `other` (边界可重合)?
    pub fn contains(&self, other: &Self) -> bool {
        self.x_min <= other.x_min
            && self.y_min <= other.y_min
            && self.x_max >= other.x_max
            && self.y_max >= other.y_max
    }

    /// 向四周各扩展自身宽高的 `ratio` 倍, 再截断到图像内.
    ///
    /// `shape` 为图像的 `(h, w)`. 多边形顶点带有 `+0.5` 修正, 因此图像内的坐标范围为
    /// `[0.5, w - 0.5] × [0.5, h - 0.5]` ⊂ `[0, w) × [0, h)`, 截断即到这个范围.
    /// 覆盖了首行 (列) 或末行 (列) 像素的边即为贴边, 扩展后保持不变.
    ///
    /// 结果对 `ratio` 单调: 比例越大, 框越大. 扩展从不缩小原框.
    pub fn extend(&self, (h, w): Idx2d, ratio: f64) -> Self {
        let lo = POLYGON_PIXEL_OFFSET;
        let (x_hi, y_hi) = (w as f64 - 1.0 + lo, h as f64 - 1.0 + lo);
        let dw = ratio * self.width();
        let dh = ratio * self.height();
        Self {
            x_min: (self.x_min - dw).max(lo).min(self.x_min),
            y_min: (self.y_min - dh).max(lo).min(self.y_min),
            x_max: (self.x_max + dw).min(x_hi).max(self.x_max),
            y_max: (self.y_max + dh).min(y_hi).max(self.y_max),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_polygons() {
        let polys = vec![vec![3.5, 2.5, 3.5, 5.5, 8.5, 5.5], vec![1.5, 9.5, 2.5, 9.5, 2.5, 8.5]];
        let b = BBox::from_polygons(&polys).unwrap();
        assert_eq!(b.to_xywh(), [1.5, 2.5, 7.0, 7.0]);
        assert_eq!(BBox::from_polygons(&[]), None);
    }

    #[test]
    fn test_extend_monotonic_and_clamped() {
        let shape = (100, 80);
        let b = BBox {
            x_min: 10.0,
            y_min: 20.0,
            x_max: 30.0,
            y_max: 60.0,
        };
        let e1 = b.extend(shape, 0.1);
        assert_eq!(e1.to_xywh(), [8.0, 16.0, 24.0, 48.0]);

        let mut prev = b;
        for ratio in [0.1, 0.2, 0.3, 0.5, 1.0, 3.0] {
            let e = b.extend(shape, ratio);
            assert!(e.contains(&prev));
            assert!(e.x_min >= 0.5 && e.y_min >= 0.5);
            assert!(e.x_max < 80.0 && e.y_max < 100.0);
            prev = e;
        }
        assert_eq!(b.extend(shape, 0.0), b);
    }

    #[test]
    fn test_extend_touching_edge() {
        // 覆盖第 0 列和最后一列 (79), 以及最后一行 (99).
        let b = BBox {
            x_min: 0.5,
            y_min: 12.5,
            x_max: 79.5,
            y_max: 99.5,
        };
        let e = b.extend((100, 80), 0.2);
        assert_eq!(e.x_min, 0.5);
        assert_eq!(e.x_max, 79.5);
        assert_eq!(e.y_max, 99.5);
        assert!(e.y_min < 12.5);

        // 右边贴边, 下边不贴边.
        let b = BBox {
            x_min: 20.5,
            y_min: 10.5,
            x_max: 29.5,
            y_max: 29.5,
        };
        let e = b.extend((40, 30), 0.2);
        assert_eq!(e.x_max, 29.5);
        assert!(e.x_max < 30.0 && e.y_max < 40.0);
        assert!((e.x_min - 18.7).abs() < 1e-9);
        assert!((e.y_max - 33.3).abs() < 1e-9);
    }
}
