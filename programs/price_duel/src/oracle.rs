//! Oracle decoding and fixed-point price arithmetic.
//!
//! A [`PriceReading`] is the raw payload of a Pyth `PriceUpdateV2` account:
//! a signed mantissa scaled by `10^exponent`, a confidence mantissa at the
//! same scale, the 32-byte feed id, and the unix publish time. Verification
//! normalizes it into the engine's 6-decimal fixed-point domain. Nothing in
//! this module touches accounts or emits events.

use anchor_lang::prelude::*;
use pyth_solana_receiver_sdk::price_update::{PriceUpdateV2, VerificationLevel};

use crate::GameError;

/// Fixed-point scale for all prices the engine stores and compares.
/// Matches the settlement token's 6-decimal convention.
pub const PRICE_DECIMALS: u32 = 6;

/// Basis points per 100%.
pub const BPS_DENOMINATOR: i128 = 10_000;

/// A decoded oracle update, not yet checked against the game configuration.
#[derive(Debug, Clone, Copy)]
pub struct PriceReading {
    pub feed_id: [u8; 32],
    pub price: i64,
    pub conf: u64,
    pub exponent: i32,
    pub publish_time: i64,
}

/// Price and confidence in the engine's 6-decimal fixed-point domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NormalizedPrice {
    pub price: u64,
    pub conf: u64,
}

impl PriceReading {
    /// Decodes a posted price update, rejecting anything that was not
    /// verified against the full Wormhole guardian set.
    pub fn from_update(update: &PriceUpdateV2) -> Result<Self> {
        require!(
            matches!(update.verification_level, VerificationLevel::Full),
            GameError::UnverifiedPriceUpdate
        );
        let message = &update.price_message;
        Ok(Self {
            feed_id: message.feed_id,
            price: message.price,
            conf: message.conf,
            exponent: message.exponent,
            publish_time: message.publish_time,
        })
    }

    /// Validates the reading against the configured feed and staleness
    /// window, then normalizes it. A reading aged exactly
    /// `max_age_seconds` is still accepted.
    pub fn verify(
        &self,
        expected_feed_id: &[u8; 32],
        max_age_seconds: u32,
        now: i64,
    ) -> Result<NormalizedPrice> {
        require!(
            self.feed_id == *expected_feed_id,
            GameError::InvalidPriceFeed
        );

        let age = now
            .checked_sub(self.publish_time)
            .ok_or(GameError::MathOverflow)?;
        require!(age <= max_age_seconds as i64, GameError::StalePriceFeed);

        let price = scale_price(self.price, self.exponent)?;
        let conf = scale_conf(self.conf, self.exponent)?;

        Ok(NormalizedPrice { price, conf })
    }
}

/// Converts an oracle mantissa/exponent pair into the 6-decimal domain.
///
/// Only downscaled feeds (`exponent <= 0`) are supported so the conversion
/// stays a lossless multiply or a truncating divide. The mantissa must be
/// strictly positive and must still be non-zero after scaling.
pub fn scale_price(mantissa: i64, exponent: i32) -> Result<u64> {
    require!(exponent <= 0, GameError::UnsupportedPositiveExponent);
    require!(mantissa > 0, GameError::InvalidPriceValue);

    let scaled = rescale(mantissa as u128, exponent)?;
    require!(scaled > 0, GameError::InvalidPriceValue);

    u64::try_from(scaled).map_err(|_| GameError::MathOverflow.into())
}

/// Confidence follows the price's exponent; zero confidence is legal.
pub fn scale_conf(conf: u64, exponent: i32) -> Result<u64> {
    require!(exponent <= 0, GameError::UnsupportedPositiveExponent);

    let scaled = rescale(conf as u128, exponent)?;
    u64::try_from(scaled).map_err(|_| GameError::MathOverflow.into())
}

/// Moves a non-negative mantissa from `10^exponent` scale to
/// `10^-PRICE_DECIMALS` scale. Division truncates toward zero.
fn rescale(mantissa: u128, exponent: i32) -> Result<u128> {
    let shift = PRICE_DECIMALS as i64 + exponent as i64;
    if shift >= 0 {
        let factor = 10u128
            .checked_pow(shift as u32)
            .ok_or(GameError::MathOverflow)?;
        mantissa
            .checked_mul(factor)
            .ok_or_else(|| GameError::MathOverflow.into())
    } else {
        let divisor = 10u128
            .checked_pow(shift.unsigned_abs() as u32)
            .ok_or(GameError::MathOverflow)?;
        Ok(mantissa / divisor)
    }
}

/// Signed price movement in basis points: `(current - initial) * 10_000 /
/// initial`, computed in i128 so the multiply cannot overflow before the
/// divide. Truncates toward zero.
pub fn price_change_bps(current: u64, initial: u64) -> Result<i64> {
    require!(initial > 0, GameError::MathOverflow);

    let diff = current as i128 - initial as i128;
    let bps = diff
        .checked_mul(BPS_DENOMINATOR)
        .ok_or(GameError::MathOverflow)?
        / initial as i128;

    i64::try_from(bps).map_err(|_| GameError::MathOverflow.into())
}
