//! 图像的持久化存储.

use super::{MaskSlice, OwnedMask};
use image::{DynamicImage, ImageBuffer, ImageResult, Luma};
use ndarray::ArrayView2;
use std::path::Path;

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// 像素值不做任何映射. 对于掩膜, 这意味着病灶像素通常是 1, 肉眼几乎不可见;
/// 对于钼靶图像, `u8` 和 `u16` 深度分别保存为 8 位和 16 位灰度 PNG.
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

macro_rules! impl_mask_raw {
    ($($mask: ty),+) => {
        $(
            impl ImgWriteRaw for $mask {
                fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let (height, width) = self.shape();
                    let mut buf = image::GrayImage::new(width as u32, height as u32);
                    for ((h, w), &pix) in self.indexed_iter() {
                        buf.put_pixel(w as u32, h as u32, Luma([pix]));
                    }
                    buf.save(path)
                }
            }
        )+
    };
}

macro_rules! impl_array_raw {
    ($($pix: ty),+) => {
        $(
            /// 按原样存储单通道图像.
            impl ImgWriteRaw for ArrayView2<'_, $pix> {
                fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
                    let (height, width) = self.dim();
                    let mut buf =
                        ImageBuffer::<Luma<$pix>, Vec<$pix>>::new(width as u32, height as u32);
                    for ((h, w), &pix) in self.indexed_iter() {
                        buf.put_pixel(w as u32, h as u32, Luma([pix]));
                    }
                    buf.save(path)
                }
            }
        )+
    };
}

impl_mask_raw!(MaskSlice<'_>);
impl_array_raw!(u8, u16);

impl OwnedMask {
    /// 见 [`ImgWriteRaw::save_raw`].
    #[inline]
    pub fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.as_slice().save_raw(path)
    }
}

/// 按 **两端均包含** 的整数框 `(x_min, y_min, x_max, y_max)` 裁剪图像.
///
/// 超出图像的部分会被截掉. 框完全落在图像外时返回 `None`.
pub fn crop_inclusive(
    img: &DynamicImage,
    (x_min, y_min, x_max, y_max): (u32, u32, u32, u32),
) -> Option<DynamicImage> {
    let x_end = x_max.saturating_add(1).min(img.width());
    let y_end = y_max.saturating_add(1).min(img.height());
    if x_min >= x_end || y_min >= y_end {
        return None;
    }
    Some(img.crop_imm(x_min, y_min, x_end - x_min, y_end - y_min))
}
