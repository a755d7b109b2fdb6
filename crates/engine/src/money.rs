use std::{
    fmt,
    iter::Sum,
    ops::{Add, AddAssign, Neg, Sub, SubAssign},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::LedgerError;

/// Signed money amount represented as **integer cents**.
///
/// Use this type for **all** monetary values in the engine (expense amounts,
/// balances, category totals) to avoid floating-point drift.
///
/// The value is signed:
/// - positive = credit / increase
/// - negative = debit / decrease
///
/// # Examples
///
/// ```rust
/// use engine::Money;
///
/// let amount = Money::new(12_34);
/// assert_eq!(amount.cents(), 1234);
/// assert_eq!(amount.to_string(), "12.34");
/// ```
///
/// Parsing from user input (accepts `.` or `,` as decimal separator; input
/// beyond 2 fractional digits is rounded at entry time):
///
/// ```rust
/// use engine::Money;
///
/// assert_eq!("10".parse::<Money>().unwrap().cents(), 1000);
/// assert_eq!("10,5".parse::<Money>().unwrap().cents(), 1050);
/// assert_eq!("10.005".parse::<Money>().unwrap().cents(), 1001);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    /// Creates a new amount from integer cents.
    #[must_use]
    pub const fn new(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the raw value in cents.
    #[must_use]
    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Returns `true` if the amount is 0.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if the amount is positive.
    #[must_use]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    /// Returns `true` if the amount is negative.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    /// Equal share of the amount over `ways` participants.
    ///
    /// Integer division truncates, so the shares of an uneven split sum to
    /// slightly less than the original amount (at most `ways - 1` cents).
    /// That drift is documented behavior, not corrected here.
    #[must_use]
    pub const fn split_share(self, ways: usize) -> Money {
        Money(self.0 / ways as i64)
    }

    /// Formats the amount with an explicit leading sign, e.g. `+3.33`.
    #[must_use]
    pub fn signed(self) -> String {
        if self.0 < 0 {
            self.to_string()
        } else {
            format!("+{self}")
        }
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let units = abs / 100;
        let cents = abs % 100;
        write!(f, "{sign}{units}.{cents:02}")
    }
}

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl From<Money> for i64 {
    fn from(value: Money) -> Self {
        value.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Self::Output {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Money) -> Self::Output {
        Money(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Money) {
        self.0 -= rhs.0;
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Self::Output {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl FromStr for Money {
    type Err = LedgerError;

    /// Parses a decimal string into cents.
    ///
    /// Accepts `.` or `,` as decimal separator and an optional leading
    /// `+`/`-`. Fractional digits beyond the second are rounded half-up at
    /// entry time.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let empty = || LedgerError::InvalidAmount("empty amount".to_string());
        let invalid = || LedgerError::InvalidAmount(format!("not a number: {s}"));
        let overflow = || LedgerError::InvalidAmount("amount too large".to_string());

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(empty());
        }

        let (negative, rest) = if let Some(stripped) = trimmed.strip_prefix('-') {
            (true, stripped)
        } else if let Some(stripped) = trimmed.strip_prefix('+') {
            (false, stripped)
        } else {
            (false, trimmed)
        };

        let rest = rest.trim().replace(',', ".");
        let mut parts = rest.split('.');
        let units_str = parts.next().ok_or_else(invalid)?;
        let frac_str = parts.next().unwrap_or("");

        if parts.next().is_some() {
            return Err(invalid());
        }
        if units_str.is_empty() && frac_str.is_empty() {
            return Err(empty());
        }
        if !units_str.chars().all(|c| c.is_ascii_digit())
            || !frac_str.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid());
        }

        let units: i64 = if units_str.is_empty() {
            0
        } else {
            units_str.parse().map_err(|_| overflow())?
        };

        let mut digits = frac_str.chars();
        let tens = digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
        let ones = digits.next().and_then(|c| c.to_digit(10)).unwrap_or(0) as i64;
        let round_up = digits
            .next()
            .and_then(|c| c.to_digit(10))
            .is_some_and(|d| d >= 5);

        let mut cents = tens * 10 + ones;
        if round_up {
            cents += 1;
        }

        let total = units
            .checked_mul(100)
            .and_then(|v| v.checked_add(cents))
            .ok_or_else(overflow)?;

        let signed = if negative {
            total.checked_neg().ok_or_else(overflow)?
        } else {
            total
        };

        Ok(Money(signed))
    }
}
