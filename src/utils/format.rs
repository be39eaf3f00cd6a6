/// Human-readable size with log-1024 units, two decimals, trailing zeros trimmed
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let exponent = ((bytes as f64).ln() / 1024_f64.ln()).floor() as usize;
    let exponent = exponent.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024_f64.powi(exponent as i32);

    let mut rendered = format!("{:.2}", value);
    while rendered.ends_with('0') {
        rendered.pop();
    }
    if rendered.ends_with('.') {
        rendered.pop();
    }

    format!("{} {}", rendered, UNITS[exponent])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero() {
        assert_eq!(format_file_size(0), "0 Bytes");
    }

    #[test]
    fn test_exact_units() {
        assert_eq!(format_file_size(1), "1 Bytes");
        assert_eq!(format_file_size(1024), "1 KB");
        assert_eq!(format_file_size(1024 * 1024), "1 MB");
        assert_eq!(format_file_size(6 * 1024 * 1024 * 1024), "6 GB");
    }

    #[test]
    fn test_fractional_values() {
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2000 * 1024 * 1024), "1.95 GB");
    }

    #[test]
    fn test_huge_values_clamp_to_largest_unit() {
        let two_pb = 2 * 1024_u64.pow(5);
        assert_eq!(format_file_size(two_pb), "2048 TB");
    }
}
