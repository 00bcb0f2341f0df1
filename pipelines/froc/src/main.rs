//! 检测结果的 PR/FROC 评估.

use clap::Parser;
use std::error::Error;

mod report;
mod runner;

fn main() -> Result<(), Box<dyn Error>> {
    utils::init_logger(log::LevelFilter::Info)?;
    let report = runner::run(&runner::Cli::parse())?;
    report.analyze();
    Ok(())
}
