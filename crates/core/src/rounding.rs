//! Price and quantity quantization shared by admission and reactive logic.

/// `round(p / tick) * tick`, presented to 10 decimal digits to avoid float
/// noise when the result is later formatted into an order body.
pub fn round_price(price: f64, tick: f64) -> f64 {
    if tick <= 0.0 {
        return price;
    }
    let rounded = (price / tick).round() * tick;
    trim_to_10_decimals(rounded)
}

/// `floor(q / step) * step`, floored up to `min_qty`.
pub fn round_qty(qty: f64, step: f64, min_qty: f64) -> f64 {
    if step <= 0.0 {
        return qty.max(min_qty);
    }
    let floored = (qty / step).floor() * step;
    trim_to_10_decimals(floored).max(min_qty)
}

fn trim_to_10_decimals(value: f64) -> f64 {
    let scaled = (value * 1e10).round() / 1e10;
    if scaled == 0.0 {
        0.0
    } else {
        scaled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_price_snaps_to_tick() {
        assert_eq!(round_price(60000.04, 0.1), 60000.0);
        assert_eq!(round_price(60000.06, 0.1), 60000.1);
    }

    #[test]
    fn round_qty_floors_to_step_and_min() {
        assert_eq!(round_qty(0.0043, 0.001, 0.001), 0.004);
        assert_eq!(round_qty(0.0001, 0.001, 0.001), 0.001);
    }

    #[test]
    fn round_qty_is_multiple_of_step() {
        let q = round_qty(1.23456, 0.01, 0.0);
        let ratio = q / 0.01;
        assert!((ratio - ratio.round()).abs() < 1e-9);
    }

    #[test]
    fn scenario_1_base_qty() {
        // equity=1000, risk=5%, leverage=5, trigger=60000, qty_step=0.001
        let margin = 1000.0 * 0.05;
        let notional = margin * 5.0;
        let qty = notional / 60000.0;
        assert_eq!(round_qty(qty, 0.001, 0.001), 0.004);
    }
}
