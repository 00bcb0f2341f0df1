//! 二值病灶掩膜及其操作.

mod contour;
mod mask;
mod rle;
mod save;

pub use contour::Contour;
pub use mask::{MaskSlice, OwnedMask};
pub use rle::Rle;
pub use save::{crop_inclusive, ImgWriteRaw};
