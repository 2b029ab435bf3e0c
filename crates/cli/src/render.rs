//! Plain-text rendering of progress and market prices.

use std::collections::BTreeMap;

use gemggark_client::events::ProgressUpdate;

/// Width of the progress bar, in characters.
const BAR_WIDTH: usize = 30;

/// Grade keywords in display order, lowest first.
const GRADE_ORDER: [&str; 3] = ["고급", "희귀", "영웅"];

/// Render one progress line, e.g. `[#######.......]  25% simulating`.
pub fn progress_line(update: &ProgressUpdate) -> String {
    let filled = ((update.progress / 100.0) * BAR_WIDTH as f64).round() as usize;
    let filled = filled.min(BAR_WIDTH);
    format!(
        "[{}{}] {:>3}% {}",
        "#".repeat(filled),
        ".".repeat(BAR_WIDTH - filled),
        update.progress.round() as u32,
        update.message
    )
}

/// Render the price table for every item whose name contains `category`,
/// ordered by grade and then by name.
pub fn price_table(prices: &BTreeMap<String, Option<u64>>, category: &str) -> String {
    let mut rows: Vec<(&str, Option<u64>)> = prices
        .iter()
        .filter(|(name, _)| name.contains(category))
        .map(|(name, price)| (name.as_str(), *price))
        .collect();
    rows.sort_by(|a, b| (grade_rank(a.0), a.0).cmp(&(grade_rank(b.0), b.0)));

    let width = rows.iter().map(|(name, _)| name.chars().count()).max().unwrap_or(0);

    rows.iter()
        .map(|&(name, price)| {
            let price = match price {
                Some(p) => p.to_string(),
                None => "N/A".to_string(),
            };
            let pad = width - name.chars().count();
            format!("{name}{}  {price:>10}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Items with no recognised grade sort first.
fn grade_rank(name: &str) -> Option<usize> {
    GRADE_ORDER.iter().position(|grade| name.contains(grade))
}
