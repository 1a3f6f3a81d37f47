use owo_colors::OwoColorize;
use pmx_core::{ProcessStatus, StatusEntry};

const HEADERS: [&str; 6] = ["Name", "PID", "Status", "CPU", "Mem", "User"];
const GAP: usize = 2;

/// Renders the `ls` table. Cells are padded before coloring so escape codes
/// do not skew the column widths.
pub fn render_table(entries: &[StatusEntry], color: bool) -> String {
	let rows: Vec<[String; 6]> = entries.iter().map(row).collect();

	let mut widths = HEADERS.map(str::len);
	for row in &rows {
		for (width, cell) in widths.iter_mut().zip(row.iter()) {
			*width = (*width).max(cell.len());
		}
	}

	let mut out = String::new();
	push_line(&mut out, &HEADERS.map(String::from), &widths, |_, cell| {
		if color {
			cell.bold().to_string()
		} else {
			cell.to_string()
		}
	});
	push_line(&mut out, &widths.map(|w| "-".repeat(w)), &widths, |_, cell| cell.to_string());

	for (entry, row) in entries.iter().zip(&rows) {
		push_line(&mut out, row, &widths, |column, cell| match (column, color) {
			(2, true) => match entry.status {
				ProcessStatus::Online => cell.green().to_string(),
				ProcessStatus::Offline => cell.dimmed().to_string(),
			},
			_ => cell.to_string(),
		});
	}
	out
}

fn row(entry: &StatusEntry) -> [String; 6] {
	let dash = || "-".to_string();
	let stats = entry.stats.as_ref();
	[
		entry.name.clone(),
		entry.pid.clone().unwrap_or_else(dash),
		entry.status.to_string(),
		stats.map(|s| format!("{}%", s.cpu)).unwrap_or_else(dash),
		stats.map(|s| format_rss(&s.rss)).unwrap_or_else(dash),
		stats.map(|s| s.user.clone()).unwrap_or_else(dash),
	]
}

fn push_line<F>(out: &mut String, cells: &[String; 6], widths: &[usize; 6], paint: F)
where
	F: Fn(usize, &str) -> String,
{
	let last = cells.len() - 1;
	for (column, (cell, width)) in cells.iter().zip(widths).enumerate() {
		let padded = if column == last {
			cell.clone()
		} else {
			format!("{:<width$}", cell, width = width + GAP)
		};
		let trailing = padded.len() - cell.len();
		out.push_str(&paint(column, cell));
		out.push_str(&" ".repeat(trailing));
	}
	out.push('\n');
}

/// `ps` reports resident size in KiB.
pub fn format_rss(kib: &str) -> String {
	let Ok(kib) = kib.parse::<u64>() else {
		return kib.to_string();
	};
	if kib >= 1024 * 1024 {
		format!("{:.1}G", kib as f64 / (1024.0 * 1024.0))
	} else if kib >= 1024 {
		format!("{:.1}M", kib as f64 / 1024.0)
	} else {
		format!("{}K", kib)
	}
}
