//! 数据处理流水线依赖的通用组件.

use log::LevelFilter;
use std::io;

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 简单分隔线.
#[inline]
pub fn sep_to<W: io::Write>(mut w: W) -> io::Result<()> {
    writeln!(&mut w, "{SEP}")
}

/// 初始化日志. 默认级别为 `level`, 可由环境变量 `RUST_LOG` 覆盖.
pub fn init_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    simple_logger::SimpleLogger::new()
        .with_level(level)
        .env()
        .init()
}
