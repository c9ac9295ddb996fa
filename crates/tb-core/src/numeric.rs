use crate::TbError;

/// Floating point type used throughout the controller.
///
/// Fixed to double precision so that fuzzy centroids and log rows are
/// reproducible across runs.
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, TbError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(TbError::NonFinite { what, value: v })
    }
}

/// Accept only finite, strictly positive values.
pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, TbError> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(TbError::InvalidArg { what })
    }
}

/// Clamp a share-like quantity to `[0, 1]`. NaN passes through.
#[inline]
pub fn clamp_unit(v: Real) -> Real {
    v.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero_negative_and_nan() {
        assert!(ensure_positive(0.0, "dt").is_err());
        assert!(ensure_positive(-3.0, "dt").is_err());
        assert!(ensure_positive(Real::NAN, "dt").is_err());
        assert!(ensure_positive(Real::INFINITY, "dt").is_err());
        assert_eq!(ensure_positive(2.5, "dt").unwrap(), 2.5);
    }

    #[test]
    fn clamp_unit_bounds() {
        assert_eq!(clamp_unit(1.2), 1.0);
        assert_eq!(clamp_unit(-0.3), 0.0);
        assert_eq!(clamp_unit(0.4), 0.4);
        assert!(clamp_unit(Real::NAN).is_nan());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn clamp_unit_stays_in_range(v in -1.0e6_f64..1.0e6_f64) {
            let c = clamp_unit(v);
            prop_assert!((0.0..=1.0).contains(&c));
        }

        #[test]
        fn nearly_equal_is_symmetric(a in -1.0e3_f64..1.0e3_f64, b in -1.0e3_f64..1.0e3_f64) {
            let tol = Tolerances::default();
            prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }
    }
}
