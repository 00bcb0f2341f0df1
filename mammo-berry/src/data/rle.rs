//! 列优先的游程编码 (与 COCO 的 uncompressed RLE 一致).

use super::{MaskSlice, OwnedMask};
use crate::consts::gray::{is_lesion, MASK_LESION};
use serde::{Deserialize, Serialize};

/// 掩膜的游程编码.
///
/// `counts` 从背景游程开始, 背景与病灶交替出现, 按列优先顺序扫描.
/// 如果第一个像素就是病灶, 则第一个游程长度为 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rle {
    /// 掩膜的 `[h, w]`.
    pub size: [usize; 2],

    /// 交替的游程长度.
    pub counts: Vec<usize>,
}

impl Rle {
    /// 病灶像素个数, 即所有奇数位置游程的和.
    pub fn area(&self) -> usize {
        self.counts.iter().skip(1).step_by(2).sum()
    }

    /// 解码回掩膜. 游程总长度与 `size` 不符时返回 `None`.
    pub fn decode(&self) -> Option<OwnedMask> {
        let [h, w] = self.size;
        if self.counts.iter().sum::<usize>() != h * w {
            return None;
        }
        let mut ans = OwnedMask::background((h, w));
        let mut pos = 0;
        for (k, &run) in self.counts.iter().enumerate() {
            if k % 2 == 1 {
                for p in pos..pos + run {
                    ans[(p % h, p / h)] = MASK_LESION;
                }
            }
            pos += run;
        }
        Some(ans)
    }
}

impl MaskSlice<'_> {
    /// 对掩膜做列优先游程编码.
    pub fn rle(&self) -> Rle {
        let (h, w) = self.shape();
        let mut counts = Vec::with_capacity(8);
        let mut current = false;
        let mut run = 0;
        for c in 0..w {
            for r in 0..h {
                let v = is_lesion(self[(r, c)]);
                if v != current {
                    counts.push(run);
                    run = 0;
                    current = v;
                }
                run += 1;
            }
        }
        counts.push(run);
        Rle { size: [h, w], counts }
    }

    /// 游程编码意义下的病灶面积.
    #[inline]
    pub fn area(&self) -> usize {
        self.rle().area()
    }
}

#[cfg(test)]
mod tests {
    use crate::OwnedMask;

    #[test]
    fn test_rle_column_major() {
        // 1 0 0
        // 1 0 1
        let m = OwnedMask::from_positions((2, 3), [(0, 0), (1, 0), (1, 2)]);
        let rle = m.as_slice().rle();
        assert_eq!(rle.size, [2, 3]);
        assert_eq!(rle.counts, vec![0, 2, 3, 1]);
        assert_eq!(rle.area(), 3);
        assert_eq!(rle.area(), m.as_slice().lesion_count());
        assert_eq!(rle.decode(), Some(m));
    }

    #[test]
    fn test_rle_background() {
        let m = OwnedMask::background((4, 5));
        let rle = m.as_slice().rle();
        assert_eq!(rle.counts, vec![20]);
        assert_eq!(m.as_slice().area(), 0);

        let mut bad = rle.clone();
        bad.counts.push(1);
        assert_eq!(bad.decode(), None);
    }
}
