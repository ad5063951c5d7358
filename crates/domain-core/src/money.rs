//! 金额计算
//!
//! 金额统一使用 `Decimal`（韩元，无小数位结算）

use commercium_errors::{AppError, AppResult};
use rust_decimal::{Decimal, RoundingStrategy};

/// 四舍五入（HALF_UP）到指定小数位
pub fn round_half_up(value: Decimal, scale: u32) -> Decimal {
    value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero)
}

/// 要求金额 >= 0
pub fn ensure_non_negative(value: Decimal, field: &str) -> AppResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(AppError::validation(format!("{}은(는) 0 이상이어야 합니다", field)));
    }
    Ok(value)
}

/// 要求金额 > 0
pub fn ensure_positive(value: Decimal, field: &str) -> AppResult<Decimal> {
    if value <= Decimal::ZERO {
        return Err(AppError::validation(format!("{}은(는) 0보다 커야 합니다", field)));
    }
    Ok(value)
}

/// 求和
pub fn sum<I>(values: I) -> Decimal
where
    I: IntoIterator<Item = Decimal>,
{
    values.into_iter().fold(Decimal::ZERO, |acc, v| acc + v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(Decimal::new(15, 1), 0), Decimal::from(2));
        assert_eq!(round_half_up(Decimal::new(25, 1), 0), Decimal::from(3));
        assert_eq!(round_half_up(Decimal::new(24, 1), 0), Decimal::from(2));
        assert_eq!(round_half_up(Decimal::new(12345, 5), 4), Decimal::new(1235, 4));
    }

    #[test]
    fn test_sign_checks() {
        assert!(ensure_non_negative(Decimal::ZERO, "amount").is_ok());
        assert!(ensure_non_negative(Decimal::from(-1), "amount").is_err());
        assert!(ensure_positive(Decimal::ZERO, "amount").is_err());
        assert!(ensure_positive(Decimal::ONE, "amount").is_ok());
    }

    #[test]
    fn test_sum() {
        let total = sum([Decimal::from(10000), Decimal::from(2500)]);
        assert_eq!(total, Decimal::from(12500));
        assert_eq!(sum(Vec::<Decimal>::new()), Decimal::ZERO);
    }
}
