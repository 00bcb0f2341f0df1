//! 通用常量.

/// 单通道颜色.
pub mod gray {
    /// 掩膜中背景的像素值. 其余任何非零值均视为病灶.
    pub const MASK_BACKGROUND: u8 = 0;

    /// 写出掩膜时病灶的像素值.
    pub const MASK_LESION: u8 = 1;

    /// 单通道黑色.
    pub const BLACK: u8 = 0b_0000_0000;

    /// 单通道白色.
    pub const WHITE: u8 = 0b_1111_1111;

    /// 像素是否是病灶?
    #[inline]
    pub const fn is_lesion(p: u8) -> bool {
        p != MASK_BACKGROUND
    }

    /// 像素是否是背景?
    #[inline]
    pub const fn is_background(p: u8) -> bool {
        matches!(p, MASK_BACKGROUND)
    }
}

/// 检测任务的类别编号.
pub mod category {
    /// 恶性.
    pub const MALIGNANT: u32 = 0;

    /// 良性 (包括 `BENIGN_WITHOUT_CALLBACK`).
    pub const BENIGN: u32 = 1;
}

/// 病灶序号搜索的上界.
///
/// 假设没有任何一张钼靶图像含有超过 100 个病灶.
pub const MAX_ABNORMALITY_INDEX: u32 = 100;

/// 多边形顶点的像素中心修正量.
pub const POLYGON_PIXEL_OFFSET: f64 = 0.5;

/// 病例目录下存放原始图像的 npz 文件名.
pub const IMAGE_ARCHIVE: &str = "image.npz";

/// `IMAGE_ARCHIVE` 中图像数组的键.
pub const IMAGE_KEY: &str = "image";

/// `mask*.npz` 中掩膜数组的键.
pub const MASK_KEY: &str = "mask";

/// 病灶掩膜文件名前缀.
pub const MASK_PREFIX: &str = "mask";

/// npz 文件扩展名.
pub const NPZ_EXT: &str = "npz";

/// 默认的 COCO 标注输出文件名.
pub const COCO_OUT_FILE: &str = "annotation_coco_with_classes.json";

/// 常用的 bbox 扩展比例.
pub const EXTEND_RATIOS: [f64; 3] = [0.1, 0.2, 0.3];
