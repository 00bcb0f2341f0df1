//! 基于 Suzuki-Abe 边界跟踪的轮廓提取.
//!
//! 提取所有外轮廓和孔洞轮廓 (完整层级, 但不输出层级关系), 并只保留方向变化处的顶点.

use super::{MaskSlice, OwnedMask};
use crate::consts::gray::is_lesion;
use crate::consts::POLYGON_PIXEL_OFFSET;
use crate::Idx2d;
use std::collections::VecDeque;

/// 逆时针 (以图像显示方向为准, h 轴向下) 排列的 8-邻域偏移 `(dh, dw)`.
///
/// 0 号为右侧, 2 号为上方, 4 号为左侧, 6 号为下方.
const DIRECTIONS: [(isize, isize); 8] = [
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// 一条闭合轮廓.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Contour {
    /// 顶点 `(h, w)`, 首尾隐式相连.
    points: Vec<Idx2d>,

    /// 是否是孔洞的边界.
    is_hole: bool,
}

impl Contour {
    /// 轮廓顶点, 首尾隐式相连.
    #[inline]
    pub fn points(&self) -> &[Idx2d] {
        &self.points
    }

    /// 是否是孔洞的边界.
    #[inline]
    pub fn is_hole(&self) -> bool {
        self.is_hole
    }

    /// 顶点个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否没有任何顶点.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 转换为 COCO 多边形格式 `[x1, y1, x2, y2, ...]`, 每个坐标加上 `offset`.
    pub fn to_flat_xy(&self, offset: f64) -> Vec<f64> {
        self.points
            .iter()
            .flat_map(|&(h, w)| [w as f64 + offset, h as f64 + offset])
            .collect()
    }
}

/// 带一圈零填充的带符号工作网格. 边界跟踪会在其中写入 `±NBD` 标记.
struct BorderGrid {
    cells: Vec<i32>,
    stride: usize,
}

impl BorderGrid {
    fn new(mask: &MaskSlice) -> Self {
        let (h, w) = mask.shape();
        let stride = w + 2;
        let mut cells = vec![0; (h + 2) * stride];
        for ((r, c), &p) in mask.indexed_iter() {
            if is_lesion(p) {
                cells[(r + 1) * stride + c + 1] = 1;
            }
        }
        Self { cells, stride }
    }

    #[inline]
    fn at(&self, (r, c): Idx2d) -> i32 {
        self.cells[r * self.stride + c]
    }

    #[inline]
    fn set(&mut self, (r, c): Idx2d, v: i32) {
        self.cells[r * self.stride + c] = v;
    }

    /// 从 `start` 出发跟踪一条边界. `from` 是与 `start` 相邻的、作为起始方向的零像素.
    fn follow(&mut self, start: Idx2d, from: Idx2d, nbd: i32) -> Vec<Idx2d> {
        let d0 = direction(start, from);
        let first = (0..8)
            .map(|k| step(start, (d0 + 8 - k) % 8))
            .find(|&p| self.at(p) != 0);
        let Some(i1) = first else {
            // 孤立像素.
            self.set(start, -nbd);
            return vec![start];
        };

        let (mut i2, mut i3) = (i1, start);
        let mut points = vec![start];
        loop {
            let d = direction(i3, i2);
            let mut right_examined = false;
            let mut i4 = i2;
            for k in 1..=8 {
                let dir = (d + k) % 8;
                let p = step(i3, dir);
                if self.at(p) != 0 {
                    i4 = p;
                    break;
                }
                if dir == 0 {
                    right_examined = true;
                }
            }

            if right_examined {
                self.set(i3, -nbd);
            } else if self.at(i3) == 1 {
                self.set(i3, nbd);
            }

            if i4 == start && i3 == i1 {
                break;
            }
            points.push(i4);
            i2 = i3;
            i3 = i4;
        }
        points
    }
}

/// `from` 指向其 8-邻居 `to` 的方向编号. 二者必须相邻.
#[inline]
fn direction(from: Idx2d, to: Idx2d) -> usize {
    let delta = (
        to.0 as isize - from.0 as isize,
        to.1 as isize - from.1 as isize,
    );
    DIRECTIONS
        .iter()
        .position(|&d| d == delta)
        .unwrap_or_else(|| unreachable!("{from:?} 和 {to:?} 不相邻"))
}

/// 沿方向 `dir` 走一步. 调用方保证不会越过填充边界.
#[inline]
fn step((r, c): Idx2d, dir: usize) -> Idx2d {
    let (dr, dc) = DIRECTIONS[dir];
    (r.wrapping_add_signed(dr), c.wrapping_add_signed(dc))
}

#[inline]
fn delta(a: Idx2d, b: Idx2d) -> (isize, isize) {
    (b.0 as isize - a.0 as isize, b.1 as isize - a.1 as isize)
}

/// 只保留进入方向与离开方向不同的顶点. 起点总是保留.
fn compress(points: &[Idx2d]) -> Vec<Idx2d> {
    let n = points.len();
    if n < 3 {
        return points.to_vec();
    }
    let mut ans = Vec::with_capacity(8);
    ans.push(points[0]);
    for k in 1..n {
        let (prev, cur, next) = (points[k - 1], points[k], points[(k + 1) % n]);
        if delta(prev, cur) != delta(cur, next) {
            ans.push(cur);
        }
    }
    ans
}

impl MaskSlice<'_> {
    /// 提取所有外轮廓与孔洞轮廓, 按光栅扫描中被发现的顺序返回.
    ///
    /// 每条轮廓只保留方向变化处的顶点. 单个像素的轮廓只有一个顶点,
    /// 单像素宽的线段只有两个端点.
    pub fn contours(&self) -> Vec<Contour> {
        let (h, w) = self.shape();
        let mut grid = BorderGrid::new(self);
        let mut nbd = 1;
        let mut ans = Vec::with_capacity(1);

        for r in 1..=h {
            for c in 1..=w {
                let v = grid.at((r, c));
                let (is_hole, from) = if v == 1 && grid.at((r, c - 1)) == 0 {
                    (false, (r, c - 1))
                } else if v >= 1 && grid.at((r, c + 1)) == 0 {
                    (true, (r, c + 1))
                } else {
                    continue;
                };
                nbd += 1;
                let traced = grid.follow((r, c), from, nbd);
                let points = compress(&traced)
                    .into_iter()
                    .map(|(r, c)| (r - 1, c - 1))
                    .collect();
                ans.push(Contour { points, is_hole });
            }
        }
        ans
    }

    /// 将掩膜转换为 COCO 多边形列表.
    ///
    /// 只保留至少 3 个顶点 (即展平后多于 4 个坐标值) 的轮廓, 所有坐标加上
    /// [`POLYGON_PIXEL_OFFSET`].
    pub fn polygons(&self) -> Vec<Vec<f64>> {
        self.contours()
            .iter()
            .filter(|c| c.len() >= 3)
            .map(|c| c.to_flat_xy(POLYGON_PIXEL_OFFSET))
            .collect()
    }
}

impl OwnedMask {
    /// 将一条外轮廓 (压缩后的顶点, 首尾相连) 重新光栅化为实心掩膜.
    ///
    /// 轮廓内部的孔洞也会被填充. 顶点必须位于 `shape` 范围内,
    /// 且相邻顶点之间只沿 8 个方向之一延伸 (即 [`MaskSlice::contours`] 的输出).
    pub fn rasterize_outer(shape: Idx2d, points: &[Idx2d]) -> Self {
        let (h, w) = shape;
        let mut ans = Self::background(shape);
        let n = points.len();
        for k in 0..n {
            let (from, to) = (points[k], points[(k + 1) % n]);
            let (dh, dw) = delta(from, to);
            let steps = dh.unsigned_abs().max(dw.unsigned_abs());
            let unit = (dh.signum(), dw.signum());
            let mut cur = from;
            ans[cur] = crate::consts::gray::MASK_LESION;
            for _ in 0..steps {
                cur = (
                    cur.0.wrapping_add_signed(unit.0),
                    cur.1.wrapping_add_signed(unit.1),
                );
                ans[cur] = crate::consts::gray::MASK_LESION;
            }
        }

        // 从外圈出发做 4-邻接填充, 没有被触及的像素即为内部.
        let mut outside = vec![false; (h + 2) * (w + 2)];
        let idx = |(r, c): Idx2d| r * (w + 2) + c;
        let is_edge = |(r, c): Idx2d| r >= 1 && r <= h && c >= 1 && c <= w && {
            crate::consts::gray::is_lesion(ans[(r - 1, c - 1)])
        };
        let mut q = VecDeque::from([(0usize, 0usize)]);
        outside[0] = true;
        while let Some((r, c)) = q.pop_front() {
            let neighbours = [
                (r.wrapping_sub(1), c),
                (r + 1, c),
                (r, c.wrapping_sub(1)),
                (r, c + 1),
            ];
            for p in neighbours {
                if p.0 > h + 1 || p.1 > w + 1 || outside[idx(p)] || is_edge(p) {
                    continue;
                }
                outside[idx(p)] = true;
                q.push_back(p);
            }
        }

        for r in 0..h {
            for c in 0..w {
                if !outside[idx((r + 1, c + 1))] {
                    ans[(r, c)] = crate::consts::gray::MASK_LESION;
                }
            }
        }
        ans
    }
}

#[cfg(test)]
mod tests {
    use crate::OwnedMask;

    fn rect(shape: (usize, usize), h: std::ops::RangeInclusive<usize>, w: std::ops::RangeInclusive<usize>) -> OwnedMask {
        OwnedMask::from_positions(
            shape,
            h.flat_map(move |r| w.clone().map(move |c| (r, c))),
        )
    }

    /// 矩形只有 4 个角点, 且从左上角开始沿左边向下.
    #[test]
    fn test_rectangle_corners() {
        let m = rect((10, 12), 2..=5, 3..=8);
        let cs = m.as_slice().contours();
        assert_eq!(cs.len(), 1);
        assert!(!cs[0].is_hole());
        assert_eq!(cs[0].points(), &[(2, 3), (5, 3), (5, 8), (2, 8)]);

        let polys = m.as_slice().polygons();
        assert_eq!(
            polys,
            vec![vec![3.5, 2.5, 3.5, 5.5, 8.5, 5.5, 8.5, 2.5]]
        );
    }

    /// 矩形环有一条外轮廓和一条孔洞轮廓.
    #[test]
    fn test_ring_has_hole() {
        let mut m = rect((9, 9), 1..=7, 1..=7);
        for r in 3..=5 {
            for c in 3..=5 {
                m[(r, c)] = 0;
            }
        }
        let cs = m.as_slice().contours();
        assert_eq!(cs.len(), 2);
        assert!(!cs[0].is_hole());
        assert!(cs[1].is_hole());
        assert_eq!(cs[0].len(), 4);
        assert_eq!(m.as_slice().polygons().len(), 2);
    }

    /// 孤立像素和单像素宽线段不构成合法多边形.
    #[test]
    fn test_degenerate_contours_dropped() {
        let m = OwnedMask::from_positions((6, 6), [(1, 1), (4, 1), (4, 2), (4, 3)]);
        let cs = m.as_slice().contours();
        assert_eq!(cs.len(), 2);
        assert_eq!(cs[0].points(), &[(1, 1)]);
        assert_eq!(cs[1].points(), &[(4, 1), (4, 3)]);
        assert!(m.as_slice().polygons().is_empty());
    }

    /// 贴着图像边缘的病灶也能正确跟踪.
    #[test]
    fn test_touching_border() {
        let m = rect((4, 4), 0..=3, 0..=3);
        let cs = m.as_slice().contours();
        assert_eq!(cs.len(), 1);
        assert_eq!(cs[0].points(), &[(0, 0), (3, 0), (3, 3), (0, 3)]);
    }

    /// 多边形化 -> 光栅化 -> 再多边形化, 顶点保持不变.
    #[test]
    fn test_polygon_idempotent() {
        // 一个不规则、无孔洞的 8-连通病灶.
        let pixels = [
            (2, 4),
            (2, 5),
            (3, 3),
            (3, 4),
            (3, 5),
            (3, 6),
            (4, 2),
            (4, 3),
            (4, 4),
            (4, 5),
            (4, 6),
            (4, 7),
            (5, 3),
            (5, 4),
            (5, 5),
            (6, 4),
            (7, 5),
        ];
        let m = OwnedMask::from_positions((10, 10), pixels);
        let first = m.as_slice().contours();
        assert_eq!(first.len(), 1);

        let again = OwnedMask::rasterize_outer((10, 10), first[0].points());
        assert_eq!(again, m);
        let second = again.as_slice().contours();
        assert_eq!(first, second);
    }
}
