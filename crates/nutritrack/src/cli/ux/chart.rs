use nutritrack_core::meal::MealSummary;

/// Width of the longest bar, in cells.
const BAR_WIDTH: usize = 30;

/// Formats a day summary as a total followed by one horizontal bar per meal slot.
pub fn format_meal_summary(summary: &MealSummary) -> String {
    let date = summary.date.format("%Y-%m-%d");
    if summary.is_empty() {
        return format!("Nenhuma refeição registrada em {date}.");
    }

    let mut out = format!("Total em {date}: {} kcal\n", summary.total);
    let label_width = summary
        .by_slot
        .iter()
        .map(|(slot, _)| slot.label().chars().count())
        .max()
        .unwrap_or(0);
    let max = summary.by_slot.iter().map(|(_, kcal)| *kcal).max().unwrap_or(0);

    for (slot, kcal) in &summary.by_slot {
        let cells = if max == 0 {
            0
        } else {
            // Non zero slots always get at least one cell
            ((*kcal as u128 * BAR_WIDTH as u128).div_ceil(max as u128)) as usize
        };
        out.push_str(&format!(
            "{:<label_width$} │{} {kcal} kcal\n",
            slot.label(),
            "█".repeat(cells),
        ));
    }
    out
}
