/*!
    Scale-factor solver for fixed-point scale engines.

    The engine only accepts isotropic factors `k / frag` with integer
    `k` in `1..=k_max`. Given a source and a target geometry, the solver
    picks a centered crop of the source and a legal `k` such that the
    scaled crop lands on the target, preferring a `k` for which the crop is
    an exact integer so no rounding error is introduced.
*/

use media_accel::ScaleFactor;
use media_types::{CropRect, Error, Result, Size};
use serde::{Deserialize, Serialize};
use tracing::warn;

/**
    Legal factor range of a scale engine.
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScaleLimits {
    /// Fixed-point denominator.
    pub frag: u32,
    /// Largest legal numerator.
    pub k_max: u32,
}

impl Default for ScaleLimits {
    fn default() -> Self {
        Self { frag: 16, k_max: 4095 }
    }
}

/**
    Result of [`solve`].
*/
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScaleSolution {
    /// Centered region of the source to scale.
    pub crop: CropRect,
    pub factor: ScaleFactor,
    /// The scaled crop matches the target on both axes without rounding.
    pub exact: bool,
}

impl ScaleSolution {
    pub fn k(&self) -> u32 {
        self.factor.numerator
    }
}

fn gcd(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/**
    Smallest divisor of `n` inside `lo..=hi`.
*/
fn smallest_divisor_in(n: u64, lo: u64, hi: u64) -> Option<u64> {
    let mut best: Option<u64> = None;
    let mut i = 1u64;
    while i * i <= n {
        if n % i == 0 {
            for d in [i, n / i] {
                if (lo..=hi).contains(&d) && best.is_none_or(|b| d < b) {
                    best = Some(d);
                }
            }
        }
        i += 1;
    }
    best
}

/**
    Find a crop of `input` and a factor mapping it onto `target`.

    Never fails for non-empty geometries and non-zero limits: when no exact
    factor exists the closest legal one is returned with `exact == false`.
*/
pub fn solve(input: Size, target: Size, limits: ScaleLimits) -> Result<ScaleSolution> {
    if input.is_empty() || target.is_empty() {
        return Err(Error::invalid_argument(format!(
            "cannot scale {input} to {target}"
        )));
    }
    if limits.frag == 0 || limits.k_max == 0 {
        return Err(Error::invalid_argument("scaler limits must be non-zero"));
    }

    let frag = limits.frag as u64;
    let k_max = limits.k_max as u64;
    let tw = target.width as u64 * frag;
    let th = target.height as u64 * frag;

    // smallest k keeping the crop inside the source on both axes
    let k_min = tw
        .div_ceil(input.width as u64)
        .max(th.div_ceil(input.height as u64))
        .clamp(1, k_max);

    let (k, mut exact) = match smallest_divisor_in(gcd(tw, th), k_min, k_max) {
        Some(k) => (k, true),
        None => (k_min, false),
    };

    let raw_w = tw / k;
    let raw_h = th / k;
    let crop_w = raw_w.clamp(1, input.width as u64) as u32;
    let crop_h = raw_h.clamp(1, input.height as u64) as u32;
    if crop_w as u64 != raw_w || crop_h as u64 != raw_h {
        exact = false;
    }

    let factor = ScaleFactor::new(k as u32, limits.frag);
    if !exact {
        warn!(
            "no exact scale factor for {input} -> {target}; using k={k}/{} with crop {crop_w}x{crop_h}",
            limits.frag
        );
    }

    Ok(ScaleSolution {
        crop: CropRect::centered(Size::new(crop_w, crop_h), input),
        factor,
        exact,
    })
}
