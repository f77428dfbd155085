//! Two-sided bounds for variable components and constraint rows.

/// Lower/upper bound pair for a single scalar component.
///
/// Equality rows are expressed as `lower == upper`; absent sides are
/// `-inf`/`+inf`. Every variable component and every constraint row carries
/// one of these, so the solver sees a uniform bound vocabulary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lower bound (`-inf` if unbounded below)
    pub lower: f64,
    /// Upper bound (`+inf` if unbounded above)
    pub upper: f64,
}

impl Bounds {
    /// Two-sided bound. `lower <= upper` is required; construction paths
    /// that accept caller-supplied bounds (`VariableBlock::with_bounds`)
    /// validate it and reject inverted pairs.
    pub const fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    /// Equality at zero, the standard bound for a residual row `r(x) = 0`.
    pub const fn zero() -> Self {
        Self { lower: 0.0, upper: 0.0 }
    }

    /// Equality at `value`.
    pub const fn equality(value: f64) -> Self {
        Self { lower: value, upper: value }
    }

    /// No bound on either side.
    pub const fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
        }
    }

    /// Bounded below only.
    pub const fn lower_bounded(lower: f64) -> Self {
        Self { lower, upper: f64::INFINITY }
    }

    /// Bounded above only.
    pub const fn upper_bounded(upper: f64) -> Self {
        Self { lower: f64::NEG_INFINITY, upper }
    }

    /// Whether `value` lies inside `[lower, upper]`.
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    /// Signed distance of `value` outside `[lower, upper]` (0 when inside).
    ///
    /// Negative when below the lower bound, positive when above the upper
    /// bound, so `violation` is continuous and differentiable almost
    /// everywhere, which is what a penalty-style solver needs.
    pub fn violation(&self, value: f64) -> f64 {
        if value < self.lower {
            value - self.lower
        } else if value > self.upper {
            value - self.upper
        } else {
            0.0
        }
    }
}
