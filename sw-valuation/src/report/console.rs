//! Console ranking table.

use sw_common::util::pad_right;

use crate::data::IndustryLevel;
use crate::valuation::IndexValuation;

use super::{format_opt, format_pct};

const RULE_WIDTH: usize = 90;

/// Render the ranking table for one level.
///
/// Rows keep the order of `results`, which callers sort by PE percentile.
pub fn render_ranking(level: IndustryLevel, results: &[IndexValuation]) -> String {
    let mut out = String::new();

    out.push_str(&"=".repeat(70));
    out.push('\n');
    out.push_str(&format!(
        "申万{}估值百分位排名（按PE百分位从低到高）\n",
        level.display_name()
    ));
    out.push_str(&"=".repeat(70));
    out.push('\n');

    if results.is_empty() {
        out.push_str("❌ 无有效数据\n");
        return out;
    }

    out.push_str(&row(&[
        ("排名", 4),
        ("行业代码", 12),
        ("行业名称", 20),
        ("PE", 10),
        ("PE百分位", 10),
        ("PB", 10),
        ("PB百分位", 10),
        ("数据点", 8),
    ]));
    out.push_str(&"-".repeat(RULE_WIDTH));
    out.push('\n');

    for (i, r) in results.iter().enumerate() {
        let rank = (i + 1).to_string();
        let pe = format_opt(r.pe, 2);
        let pe_pct = format_pct(r.pe_percentile);
        let pb = format_opt(r.pb, 2);
        let pb_pct = format_pct(r.pb_percentile);
        let samples = r.sample_count.to_string();

        out.push_str(&row(&[
            (rank.as_str(), 4),
            (r.index_code.as_str(), 12),
            (r.index_name.as_str(), 20),
            (pe.as_str(), 10),
            (pe_pct.as_str(), 10),
            (pb.as_str(), 10),
            (pb_pct.as_str(), 10),
            (samples.as_str(), 8),
        ]));
    }

    out
}

fn row(cells: &[(&str, usize)]) -> String {
    let line: Vec<String> = cells.iter().map(|(text, width)| pad_right(text, *width)).collect();
    format!("{}\n", line.join(" ").trim_end())
}
