use crate::errors::ServiceError;

/// Line total for `quantity` units at `unit_price`.
///
/// Quantities below one are rejected; callers validate them earlier, this
/// only keeps a bad value from being frozen into a line item.
pub fn compute_price(unit_price: f64, quantity: i32) -> Result<f64, ServiceError> {
    if quantity < 1 {
        return Err(ServiceError::InvalidInput(format!(
            "Quantity must be a positive integer, got {}",
            quantity
        )));
    }
    Ok(unit_price * f64::from(quantity))
}

/// Picks the price stored on a line item: an explicit override wins verbatim,
/// otherwise the current unit price times the quantity.
pub fn resolve_price(
    override_price: Option<f64>,
    unit_price: f64,
    quantity: i32,
) -> Result<f64, ServiceError> {
    match override_price {
        Some(price) => Ok(price),
        None => compute_price(unit_price, quantity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    #[rstest]
    #[case(58000.0, 1, 58000.0)]
    #[case(58000.0, 2, 116000.0)]
    #[case(11000.0, 3, 33000.0)]
    #[case(0.0, 4, 0.0)]
    fn multiplies_unit_price(#[case] unit: f64, #[case] qty: i32, #[case] expected: f64) {
        assert_eq!(compute_price(unit, qty).unwrap(), expected);
    }

    #[test]
    fn rejects_non_positive_quantity() {
        assert_matches!(compute_price(10.0, 0), Err(ServiceError::InvalidInput(_)));
        assert_matches!(compute_price(10.0, -2), Err(ServiceError::InvalidInput(_)));
    }

    #[test]
    fn override_is_stored_verbatim() {
        assert_eq!(resolve_price(Some(99.5), 58000.0, 2).unwrap(), 99.5);
        assert_eq!(resolve_price(None, 58000.0, 2).unwrap(), 116000.0);
    }
}
