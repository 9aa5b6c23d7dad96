/// Groups an integer with `.` every three digits: `1791` becomes `1.791`.
pub fn format_number_pt_br(value: u64) -> String {
    group_thousands(&value.to_string())
}

/// Brazilian real with two decimals: `500000.0` becomes `R$ 500.000,00`.
pub fn format_brl(value: f64) -> String {
    if !value.is_finite() {
        return "R$ -".to_string();
    }
    let cents = (value.abs() * 100.0).round() as u128;
    let integer = (cents / 100).to_string();
    let fraction = cents % 100;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$ {},{fraction:02}", group_thousands(&integer))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (len - idx) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_group_with_dots() {
        assert_eq!(format_number_pt_br(0), "0");
        assert_eq!(format_number_pt_br(999), "999");
        assert_eq!(format_number_pt_br(1791), "1.791");
        assert_eq!(format_number_pt_br(1234567), "1.234.567");
    }

    #[test]
    fn currency_uses_comma_decimals() {
        assert_eq!(format_brl(500000.0), "R$ 500.000,00");
        assert_eq!(format_brl(1004751.456), "R$ 1.004.751,46");
        assert_eq!(format_brl(0.5), "R$ 0,50");
        assert_eq!(format_brl(-12.3), "-R$ 12,30");
        assert_eq!(format_brl(f64::NAN), "R$ -");
    }
}
