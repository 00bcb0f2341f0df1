use crate::consts::gray::*;
use crate::Idx2d;
use ndarray::iter::Iter;
use ndarray::{Array2, ArrayView2, Ix2};
use std::ops::{Index, IndexMut};

/// 不可变、借用的二维病灶掩膜.
///
/// 像素值为 [`MASK_BACKGROUND`] 的是背景, 其余均视为病灶.
#[derive(Clone, Copy)]
pub struct MaskSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 [`OwnedMask`] 或外部数组.
    data: ArrayView2<'a, u8>,
}

impl Index<Idx2d> for MaskSlice<'_> {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> MaskSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub fn new(data: ArrayView2<'a, u8>) -> Self {
        Self { data }
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'a, u8> {
        self.data
    }

    /// 获取可以迭代图像像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, u8, Ix2> {
        self.data.iter()
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
    }

    /// 该掩膜是否为全背景?
    #[inline]
    pub fn is_background(&self) -> bool {
        self.data.iter().copied().all(is_background)
    }

    /// 掩膜的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 掩膜的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 掩膜的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 掩膜的像素个数.
    #[inline]
    pub fn size(&self) -> usize {
        let (h, w) = self.shape();
        h * w
    }

    /// 判断一个索引是否合法 (未越界).
    #[inline]
    pub fn check(&self, (h, w): Idx2d) -> bool {
        let (h_len, w_len) = self.shape();
        h < h_len && w < w_len
    }

    /// 病灶像素总个数.
    ///
    /// 与 [`crate::Rle::area`] 的结果一致, 但不经过游程编码.
    #[inline]
    pub fn lesion_count(&self) -> usize {
        self.data.iter().filter(|&&p| is_lesion(p)).count()
    }

    /// 以行优先规则, 获取能迭代图像所有 `(索引, 像素值)` 的迭代器.
    #[inline]
    pub fn indexed_iter(&self) -> impl Iterator<Item = (Idx2d, &u8)> {
        self.data.indexed_iter()
    }

    /// 病灶像素的包围范围 `((h_min, w_min), (h_max, w_max))`, 两端均包含.
    /// 全背景时返回 `None`.
    pub fn lesion_envelope(&self) -> Option<(Idx2d, Idx2d)> {
        self.indexed_iter()
            .filter(|&(_, &p)| is_lesion(p))
            .fold(None, |acc, ((h, w), _)| match acc {
                None => Some(((h, w), (h, w))),
                Some(((h0, w0), (h1, w1))) => {
                    Some(((h0.min(h), w0.min(w)), (h1.max(h), w1.max(w))))
                }
            })
    }

    /// 克隆自己, 获得一个拥有所有权的掩膜对象.
    pub fn to_owned(&self) -> OwnedMask {
        OwnedMask {
            data: self.data.to_owned(),
        }
    }
}

/// 拥有所有权的二维病灶掩膜.
///
/// `OwnedMask` 仅提供到 `MaskSlice` 的轻量转换, 逐像素写入, 和底层数据移动.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OwnedMask {
    data: Array2<u8>,
}

impl OwnedMask {
    /// 创建形状为 `(h, w)` 的全背景掩膜.
    #[inline]
    pub fn background(shape: Idx2d) -> Self {
        Self {
            data: Array2::from_elem(shape, MASK_BACKGROUND),
        }
    }

    /// 直接包装底层数据.
    #[inline]
    pub fn from_raw(data: Array2<u8>) -> Self {
        Self { data }
    }

    /// 创建形状为 `shape` 的掩膜, 并将 `it` 中的索引设为病灶.
    ///
    /// 越界的索引会导致 panic.
    pub fn from_positions<I: IntoIterator<Item = Idx2d>>(shape: Idx2d, it: I) -> Self {
        let mut ans = Self::background(shape);
        for pos in it {
            ans[pos] = MASK_LESION;
        }
        ans
    }

    /// 获得不可变掩膜引用.
    #[inline]
    pub fn as_slice(&self) -> MaskSlice<'_> {
        MaskSlice::new(self.data.view())
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array2<u8> {
        self.data
    }
}

impl Index<Idx2d> for OwnedMask {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx2d> for OwnedMask {
    #[inline]
    fn index_mut(&mut self, index: Idx2d) -> &mut Self::Output {
        &mut self.data[index]
    }
}
