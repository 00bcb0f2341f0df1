//! 程序运行函数.

use crate::report::FrocReport;
use clap::Parser;
use mammo_berry::consts::category::{BENIGN, MALIGNANT};
use mammo_berry::eval::{self, BoxSelect, CenterTieBreak};
use std::error::Error;
use std::fs;
use std::path::PathBuf;

/// 参与评估的类别.
const CLASSES: [(u32, &str); 2] = [(MALIGNANT, "malignant"), (BENIGN, "benign")];

#[derive(Debug, Parser)]
#[command(version, about = "检测结果的 PR/FROC 评估")]
pub struct Cli {
    /// COCO 格式的真值 JSON.
    #[arg(short, long = "gt_bboxes_json")]
    gt: PathBuf,

    /// 检测结果 JSON.
    #[arg(short, long = "pred_bboxes_json")]
    pred: PathBuf,

    /// 预测框的选取方式.
    #[arg(short, long = "bbox_select", value_enum, default_value_t = BoxSelect::All)]
    bbox_select: BoxSelect,

    /// 曲线输出目录.
    #[arg(short, long = "save_path")]
    save_path: PathBuf,

    /// 中心点规则下有多个候选真值框时取 IoU 最大的一个, 而不是最后一个.
    #[arg(long = "best_overlap")]
    best_overlap: bool,
}

impl Cli {
    /// 中心点规则的多候选选择方式.
    fn tie_break(&self) -> CenterTieBreak {
        if self.best_overlap {
            CenterTieBreak::BestOverlap
        } else {
            CenterTieBreak::LastCandidate
        }
    }
}

/// 实际运行.
pub fn run(cli: &Cli) -> Result<FrocReport, Box<dyn Error>> {
    let tie_break = cli.tie_break();
    fs::create_dir_all(&cli.save_path)?;

    let mut reports = Vec::with_capacity(CLASSES.len());
    for (id, name) in CLASSES {
        let lists = eval::load_box_lists(&cli.gt, &cli.pred, id, cli.bbox_select)?;
        let report = eval::evaluate_category(&lists, id, name, tie_break)?;
        let path = cli.save_path.join(format!("curves_{name}_{}.csv", cli.bbox_select));
        eval::write_curves_csv(&path, &report)?;
        log::info!("曲线写入 {}", path.display());
        reports.push(report);
    }
    Ok(FrocReport::new(reports))
}
