use rust_decimal::Decimal;

pub fn fmt_money(d: &Decimal) -> String {
    format!("${}", d.round_dp(2))
}

/// `[#####-----]` style bar for a 0-100 percentage.
pub fn bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bar_is_clamped() {
        assert_eq!(bar(50.0, 10), "[#####-----]");
        assert_eq!(bar(250.0, 4), "[####]");
        assert_eq!(bar(-3.0, 4), "[----]");
    }

    #[test]
    fn money_has_two_places_at_most() {
        assert_eq!(fmt_money(&Decimal::new(12345, 3)), "$12.34");
    }
}
