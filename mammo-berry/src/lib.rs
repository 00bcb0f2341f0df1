#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供 CBIS-DDSM 乳腺钼靶数据集的病灶标注匹配, COCO 格式转换,
//! 病灶切片提取, 以及检测结果评估等基础算法.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 该 crate 目前主要负责处理 CBIS-DDSM 数据 (每个病例一个目录, 目录下有
//!   `<病例名>.png` 及若干 `mask*.npz`), 没有对其它源的数据进行直接适配
//!   (但如果新数据按照该模式进行组织, 也可以工作).
//! 2. 输入数据被视为可信的科研数据. 数据本身的问题 (未知病理标签, 无法匹配的病灶)
//!   以 `Result::Err` 返回, 底层 I/O 错误原样向上传递.
//!
//! # 开发计划
//!
//! ### 病灶标识解析与临床标注表匹配 ✅
//!
//! 从病例目录名拆出 `(病人, 左右, 视图, 病灶序号)`, 在 CSV 标注表中做四键精确匹配.
//! 病灶序号不可靠时按序号递增重试, 重试次数有上界.
//!
//! 实现位于 `mammo-berry/src/roi`.
//!
//! ### 掩膜轮廓提取 (Suzuki-Abe 边界跟踪) ✅
//!
//! 提取所有外轮廓与孔洞轮廓, 并压缩为方向变化点.
//!
//! 实现位于 `mammo-berry/src/data/contour.rs`.
//!
//! ### COCO 数据集转换 ✅
//!
//! 包括紧致 bbox, 按比例扩展 bbox, 以及保留原始 bbox 的增广模式.
//!
//! 实现位于 `mammo-berry/src/coco`.
//!
//! ### 病灶切片提取 ✅
//!
//! 按病理或形态学特征分类保存病灶切片.
//!
//! 实现位于 `mammo-berry/src/patches.rs`.
//!
//! ### 多标签类别编码 ✅
//!
//! 单标签/组合标签与 multi-hot 向量的双向转换.
//!
//! 实现位于 `mammo-berry/src/labels`.
//!
//! ### 检测评估 (PR 曲线, FROC 曲线, AP) ✅
//!
//! 贪心的按置信度一对一匹配, 支持 IoU 阈值和中心点两种规则.
//!
//! 实现位于 `mammo-berry/src/eval`.
//!
//! ### 坐标约定
//!
//! 库内部的像素索引一律为 `(h, w)`. 只有在输出 COCO 多边形和 bbox 时才转换为
//! `(x, y) = (w, h)`, 并且多边形顶点做 `+(0.5, 0.5)` 修正, 使离散像素轮廓与
//! COCO 的连续坐标对齐.

/// 二维索引 `(h, w)`, 同时也可一定程度上用作非负整数向量.
pub type Idx2d = (usize, usize);

/// 二值掩膜基础数据结构.
mod data;

pub use data::{crop_inclusive, Contour, ImgWriteRaw, MaskSlice, OwnedMask, Rle};

pub mod coco;

pub mod config;

pub mod consts;

pub mod dataset;

pub mod eval;

pub mod labels;

pub mod patches;

pub mod prelude;

pub mod roi;
