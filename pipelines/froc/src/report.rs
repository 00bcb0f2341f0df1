//! 评估结果.

use mammo_berry::eval::{mean_aps, CategoryReport};
use std::io::{self, Write};

/// 将一个类别的结果写进 `w` 中.
fn describe_into<W: Write>(r: &CategoryReport, w: &mut W) -> io::Result<()> {
    const S4: &str = "    ";

    writeln!(w, "Category `{}` (id {}):", r.category_name, r.category_id)?;
    for (rule, curve) in r.curves.iter() {
        let rule = rule.to_string();
        let recall = curve.recall.last().copied().unwrap_or(0.0);
        writeln!(
            w,
            "{S4}{rule:<10} AP = {:.2}, TP = {}, FP = {}, 最终召回率 = {recall:.4}",
            curve.average_precision, curve.true_positives, curve.false_positives
        )?;
    }
    Ok(())
}

/// 所有类别的评估结果.
pub struct FrocReport {
    data: Vec<CategoryReport>,
}

impl FrocReport {
    /// 由各类别的结果构造.
    pub fn new(data: Vec<CategoryReport>) -> Self {
        Self { data }
    }

    /// 写出每个类别的结果, 以及各规则下的 mAP.
    pub fn write_to<W: Write>(&self, mut w: W) -> io::Result<()> {
        for r in self.data.iter() {
            describe_into(r, &mut w)?;
            utils::sep_to(&mut w)?;
        }
        let Some(first) = self.data.first() else {
            return writeln!(w, "没有类别");
        };
        let maps = mean_aps(&self.data);
        for ((rule, _), m) in first.curves.iter().zip(maps) {
            writeln!(w, "mAP {:<10} = {m:.4}", rule.to_string())?;
        }
        Ok(())
    }

    /// 打印结果.
    pub fn analyze(&self) {
        utils::sep();
        if let Err(e) = self.write_to(io::stdout().lock()) {
            log::error!("输出结果失败: {e}");
        }
    }
}
