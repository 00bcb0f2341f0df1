//! 程序运行函数.

use clap::{Args, Parser, Subcommand, ValueEnum};
use mammo_berry::coco::{self, ConvertOptions, ConvertOutcome, CocoCategory, CocoDataset};
use mammo_berry::config::ExperimentConfig;
use mammo_berry::consts::{COCO_OUT_FILE, EXTEND_RATIOS};
use mammo_berry::dataset;
use mammo_berry::patches;
use mammo_berry::roi::{AnnotationTable, FeatureFilter, LesionKind};
use std::error::Error;
use std::path::{Path, PathBuf};
use utils::loader;

type Result<T> = std::result::Result<T, Box<dyn Error>>;

#[derive(Debug, Parser)]
#[command(version, about = "CBIS-DDSM 预处理")]
pub struct Cli {
    /// 处理后的数据集根目录. 缺省时使用 `$CBIS_DDSM_DIR` 或 `~/dataset/cbis_ddsm`.
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Kind {
    Mass,
    Calc,
}

impl From<Kind> for LesionKind {
    fn from(k: Kind) -> Self {
        match k {
            Kind::Mass => LesionKind::Mass,
            Kind::Calc => LesionKind::Calcification,
        }
    }
}

#[derive(Debug, Args)]
struct Splits {
    /// 病灶类型.
    #[arg(short, long, value_enum, default_value = "mass")]
    kind: Kind,

    /// 处理的划分. 缺省时处理全部四个划分.
    #[arg(short, long)]
    split: Vec<String>,
}

impl Splits {
    fn names(&self) -> Vec<&str> {
        if self.split.is_empty() {
            loader::SPLITS.to_vec()
        } else {
            self.split.iter().map(String::as_str).collect()
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// 将每个病例的 `image.npz` 渲染为 PNG.
    Render(Splits),

    /// 转换为 COCO 格式标注.
    Convert {
        #[command(flatten)]
        splits: Splits,

        /// 同时按 0.1, 0.2, 0.3 的比例生成扩展 bbox 的版本.
        #[arg(long)]
        extend: bool,

        /// 扩展 bbox 时同时保留原始 bbox.
        #[arg(long)]
        keep_original: bool,
    },

    /// 按病理诊断提取病灶切片到 `<root>/<kind>/cls/pathology/<fold>/`.
    Pathology {
        #[command(flatten)]
        splits: Splits,

        /// 只保留特征完整且不是组合类型的病灶.
        #[arg(long)]
        filter: bool,
    },

    /// 按形态学特征提取病灶切片到 `<root>/<kind>/cls/<特征>/<fold>/`.
    Features(Splits),

    /// 统计图像与切片个数.
    Stats,

    /// 导出检测真值文本文件.
    Gt {
        /// 划分根目录, 其中应有转换好的 COCO 标注.
        data_root: PathBuf,

        /// 输出目录.
        out_dir: PathBuf,
    },

    /// 由命令行超参数生成实验配置文件.
    Config {
        /// 输出文件.
        out: PathBuf,

        /// 超参数, 例如 `-- --lr 0.01 --batch_size 16`.
        #[arg(last = true)]
        params: Vec<String>,
    },
}

/// 实际运行.
pub fn run(cli: Cli) -> Result<()> {
    let root = match cli.root {
        Some(r) => r,
        None => loader::root_from_env_or_home().ok_or("无法确定数据集根目录")?,
    };
    match cli.command {
        Command::Render(splits) => render(&root, &splits),
        Command::Convert {
            splits,
            extend,
            keep_original,
        } => convert(&root, &splits, extend, keep_original),
        Command::Pathology { splits, filter } => pathology(&root, &splits, filter),
        Command::Features(splits) => features(&root, &splits),
        Command::Stats => {
            let stats = dataset::statistics(root.join("mass"), root.join("calc"))?;
            utils::sep();
            print!("{stats}");
            utils::sep();
            Ok(())
        }
        Command::Gt { data_root, out_dir } => {
            let coco = CocoDataset::from_path(data_root.join(COCO_OUT_FILE))?;
            let n = coco::export_detection_gt(&coco, out_dir)?;
            log::info!("写出 {n} 个真值文件");
            Ok(())
        }
        Command::Config { out, params } => {
            let args = std::iter::once("config".to_owned()).chain(params);
            ExperimentConfig::parse(args)?.save(&out)?;
            log::info!("配置写入 {}", out.display());
            Ok(())
        }
    }
}

fn render(root: &Path, splits: &Splits) -> Result<()> {
    for split in splits.names() {
        let dir = loader::split_root(root, splits.kind.into(), split);
        let s = dataset::render_case_images(&dir)?;
        log::info!(
            "{}: 新渲染 {}, 已存在 {}, 文件不足 {}",
            dir.display(),
            s.rendered,
            s.existing,
            s.sparse
        );
    }
    Ok(())
}

fn categories(kind: LesionKind) -> Vec<CocoCategory> {
    match kind {
        LesionKind::Mass => coco::mass_categories(),
        LesionKind::Calcification => coco::calc_categories(),
    }
}

fn convert(root: &Path, splits: &Splits, extend: bool, keep_original: bool) -> Result<()> {
    let kind: LesionKind = splits.kind.into();
    for split in splits.names() {
        let dir = loader::split_root(root, kind, split);
        let csv = loader::annotation_file(kind, split);

        let mut options = vec![ConvertOptions::tight(&csv)];
        if extend {
            options.extend(EXTEND_RATIOS.map(|r| ConvertOptions::extended(&csv, r, keep_original)));
        }
        for opt in options.iter() {
            match coco::convert_cbis_to_coco(&dir, categories(kind), opt)? {
                ConvertOutcome::Written(s) => log::info!(
                    "{}: 跳过 {} 个病例, {} 个病灶",
                    s.out_path.display(),
                    s.skipped_cases,
                    s.skipped_lesions
                ),
                ConvertOutcome::AlreadyExists(_) => {}
            }
        }
    }
    Ok(())
}

fn pathology(root: &Path, splits: &Splits, filter: bool) -> Result<()> {
    let kind: LesionKind = splits.kind.into();
    let save_base = root.join(loader::lesion_dir(kind)).join("cls").join("pathology");
    for split in splits.names() {
        let dir = loader::split_root(root, kind, split);
        let table = AnnotationTable::from_path(dir.join(loader::annotation_file(kind, split)))?;
        let filter = filter.then(|| FeatureFilter::new(kind));
        let s = patches::extract_pathology_patches(&table, &dir, save_base.join(loader::patch_fold(split)), filter)?;
        log::info!(
            "{split}: 写出 {}, 缺少图像 {}, 特征不完整病例 {}, 跳过病灶 {}",
            s.written,
            s.missing_images,
            s.incomplete_cases,
            s.skipped_lesions
        );
    }
    Ok(())
}

fn features(root: &Path, splits: &Splits) -> Result<()> {
    let kind: LesionKind = splits.kind.into();
    let cls = root.join(loader::lesion_dir(kind)).join("cls");
    let [first, second] = kind.feature_names();
    for split in splits.names() {
        let dir = loader::split_root(root, kind, split);
        let table = AnnotationTable::from_path(dir.join(loader::annotation_file(kind, split)))?;
        let fold = loader::patch_fold(split);
        let s = patches::extract_feature_patches(
            &table,
            &dir,
            kind,
            cls.join(first).join(fold),
            cls.join(second).join(fold),
        )?;
        log::info!("{split}: 写出 {}, 已存在 {}", s.written, s.existing);
    }
    Ok(())
}
