//! 将 `image.npz` 渲染为 `<病例名>.png`.

use super::{case_loader, CaseDir, DatasetError, MammoImage, NpzArchive};
use crate::consts::IMAGE_ARCHIVE;
use crate::ImgWriteRaw;
use std::path::Path;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 一次渲染的统计.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderSummary {
    /// 本次新写出的图像个数.
    pub rendered: usize,

    /// 已有图像而跳过的病例个数.
    pub existing: usize,

    /// 文件不足 2 个而跳过的病例个数.
    pub sparse: usize,
}

enum Rendered {
    New,
    Existing,
    Sparse,
}

fn render_one(case: &CaseDir) -> Result<Rendered, DatasetError> {
    if case.file_count < 2 {
        log::info!("{} 只有 {} 个文件, 跳过", case.name, case.file_count);
        return Ok(Rendered::Sparse);
    }
    if case.has_image() {
        return Ok(Rendered::Existing);
    }
    let mut npz = NpzArchive::open(case.path.join(IMAGE_ARCHIVE))?;
    match npz.image()? {
        MammoImage::U8(a) => a.view().save_raw(&case.image_path)?,
        MammoImage::U16(a) => a.view().save_raw(&case.image_path)?,
    }
    log::debug!("渲染 {}", case.image_path.display());
    Ok(Rendered::New)
}

/// 对划分根目录 `root` 下每个至少有 2 个文件且还没有 `<病例名>.png` 的病例,
/// 将 `image.npz` 中的图像按原样写出为 PNG.
pub fn render_case_images<P: AsRef<Path>>(root: P) -> Result<RenderSummary, DatasetError> {
    let cases = case_loader(root)?.collect::<std::io::Result<Vec<_>>>()?;

    cfg_if::cfg_if! {
        if #[cfg(feature = "rayon")] {
            let results: Vec<_> = cases.into_par_iter().map(|c| render_one(&c)).collect();
        } else {
            let results: Vec<_> = cases.iter().map(render_one).collect();
        }
    }

    let mut ans = RenderSummary::default();
    for r in results {
        match r? {
            Rendered::New => ans.rendered += 1,
            Rendered::Existing => ans.existing += 1,
            Rendered::Sparse => ans.sparse += 1,
        }
    }
    Ok(ans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::write_npz;
    use ndarray::Array2;
    use std::fs;

    #[test]
    fn test_render_case_images() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();

        let full = root.join("Calc-Test_P_00038_LEFT_CC");
        fs::create_dir(&full).unwrap();
        let img = Array2::from_shape_fn((5, 6), |(h, w)| (h * 10 + w) as u8);
        write_npz(&full.join("image.npz"), "image", &img);
        write_npz(&full.join("mask.npz"), "mask", &Array2::<u8>::zeros((5, 6)));

        let sparse = root.join("Calc-Test_P_00039_LEFT_CC");
        fs::create_dir(&sparse).unwrap();
        write_npz(&sparse.join("image.npz"), "image", &img);

        let s = render_case_images(root).unwrap();
        assert_eq!(s, RenderSummary { rendered: 1, existing: 0, sparse: 1 });

        let png = image::open(full.join("Calc-Test_P_00038_LEFT_CC.png"))
            .unwrap()
            .to_luma8();
        assert_eq!(png.get_pixel(5, 4).0, [45]);

        let s = render_case_images(root).unwrap();
        assert_eq!(s, RenderSummary { rendered: 0, existing: 1, sparse: 1 });
    }
}
