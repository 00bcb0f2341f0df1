//! CBIS-DDSM 预处理流水线: 渲染图像, 转换 COCO 标注, 提取病灶切片.

use clap::Parser;
use std::error::Error;

mod runner;

fn main() -> Result<(), Box<dyn Error>> {
    utils::init_logger(log::LevelFilter::Info)?;
    let cli = runner::Cli::parse();
    runner::run(cli)
}
