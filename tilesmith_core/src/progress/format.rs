use std::time::Duration;

/// Renders a bar of `width` cells with eighth-cell precision.
pub fn make_bar(pos: u64, len: u64, width: usize) -> String {
	const PARTIALS: [char; 8] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉'];

	let fraction = (pos as f64 / len.max(1) as f64).clamp(0.0, 1.0);
	let eighths = (fraction * width as f64 * 8.0).floor() as usize;
	let full = (eighths / 8).min(width);

	let mut bar = "█".repeat(full);
	if full < width {
		bar.push(PARTIALS[eighths % 8]);
		bar.push_str(&" ".repeat(width - full - 1));
	}
	bar
}

pub fn format_rate(per_sec: f64) -> String {
	if !per_sec.is_finite() {
		return "--/s".to_string();
	}
	let (value, unit) = match per_sec.abs() {
		v if v >= 1e9 => (per_sec / 1e9, "G"),
		v if v >= 1e6 => (per_sec / 1e6, "M"),
		v if v >= 1e3 => (per_sec / 1e3, "k"),
		_ => return format!("{per_sec:.0}/s"),
	};
	format!("{value:.1}{unit}/s")
}

pub fn format_eta(duration: Duration) -> String {
	let total = duration.as_secs();
	let (days, hours, minutes, seconds) = (total / 86_400, (total % 86_400) / 3_600, (total % 3_600) / 60, total % 60);
	match total {
		0..60 => format!("{seconds}s"),
		60..3_600 => format!("{minutes:02}:{seconds:02}"),
		3_600..86_400 => format!("{hours}:{minutes:02}:{seconds:02}"),
		_ => format!("{days}d{hours:02}h"),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(0, 10, 4, "    ")]
	#[case(10, 10, 4, "████")]
	#[case(5, 10, 4, "██  ")]
	#[case(1, 16, 2, "▏ ")]
	#[case(3, 4, 3, "██▎")]
	fn bar(#[case] pos: u64, #[case] len: u64, #[case] width: usize, #[case] expected: &str) {
		let bar = make_bar(pos, len, width);
		assert_eq!(bar, expected);
		assert_eq!(bar.chars().count(), width);
	}

	#[rstest]
	#[case(0.0, "0/s")]
	#[case(999.0, "999/s")]
	#[case(1234.0, "1.2k/s")]
	#[case(2_500_000.0, "2.5M/s")]
	#[case(f64::NAN, "--/s")]
	fn rate(#[case] input: f64, #[case] expected: &str) {
		assert_eq!(format_rate(input), expected);
	}

	#[rstest]
	#[case(45, "45s")]
	#[case(65, "01:05")]
	#[case(11_142, "3:05:42")]
	#[case(189_300, "2d04h")]
	fn eta(#[case] secs: u64, #[case] expected: &str) {
		assert_eq!(format_eta(Duration::from_secs(secs)), expected);
	}
}
