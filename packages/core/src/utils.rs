/// Round to two decimal places, half away from zero
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Absolute margin between retail price and cost
pub fn profit_margin(cost: f64, retail_price: f64) -> f64 {
    retail_price - cost
}

/// Margin as a percentage of the retail price, rounded to two decimals.
///
/// Returns `None` when the retail price is zero (or not finite), since the
/// ratio is undefined there.
pub fn profit_margin_percentage(cost: f64, retail_price: f64) -> Option<f64> {
    if retail_price == 0.0 || !retail_price.is_finite() {
        return None;
    }
    Some(round2(profit_margin(cost, retail_price) / retail_price * 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(12.345_6), 12.35);
        assert_eq!(round2(-1.005_1), -1.01);
        assert_eq!(round2(3.0), 3.0);
    }

    #[test]
    fn test_profit_margin() {
        assert_eq!(profit_margin(20.0, 50.0), 30.0);
        assert_eq!(profit_margin(60.0, 50.0), -10.0);
    }

    #[test]
    fn test_profit_margin_percentage() {
        assert_eq!(profit_margin_percentage(20.0, 50.0), Some(60.0));
        assert_eq!(profit_margin_percentage(10.0, 30.0), Some(66.67));
    }

    #[test]
    fn test_profit_margin_percentage_zero_price() {
        assert_eq!(profit_margin_percentage(5.0, 0.0), None);
        assert_eq!(profit_margin_percentage(0.0, 0.0), None);
    }
}
