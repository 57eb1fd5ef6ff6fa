// Weight algebra: the semiring trait and its reference instances.

use std::cmp::Ordering;
use std::fmt::Debug;

/// A semiring of path weights.
///
/// `plus` combines the weights of alternative paths (it must be commutative
/// and associative, with `zero` as identity); `times` combines the weights
/// along a single path (associative, with `one` as identity). Distributivity
/// of `times` over `plus` is a precondition on implementors, not something
/// the engine checks at runtime: an algebra that violates it will silently
/// produce unsound language weights.
///
/// All graph algorithms are generic over one `W: Semiring`, so automata
/// built under different weight algebras cannot be combined at all -- the
/// mismatch is a type error rather than a runtime check.
pub trait Semiring: Copy + Clone + Debug + PartialEq {
    /// Additive identity: the weight of "no path".
    fn zero() -> Self;

    /// Multiplicative identity: the weight of the empty path.
    fn one() -> Self;

    /// Combine the weights of alternative paths.
    fn plus(self, other: Self) -> Self;

    /// Extend a path weight by one more step.
    fn times(self, other: Self) -> Self;

    /// Map a numeric weight literal from a pattern annotation (`<w>`) into
    /// this algebra.
    fn from_literal(value: f64) -> Self;

    /// Factor `base` out of `self`: the partial inverse of `times` used to
    /// normalize residual weights during subset construction. When `base`
    /// is a `plus`-combination of terms including `self`,
    /// `base.times(self.divide(base))` must equal `self`.
    fn divide(self, base: Self) -> Self;

    fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    fn is_one(&self) -> bool {
        *self == Self::one()
    }
}

/// A total order over weights, used by shortest-path search and best-first
/// evaluation. `Ordering::Less` means "preferred".
pub trait NaturalOrder: Semiring {
    fn natural_cmp(&self, other: &Self) -> Ordering;
}

// ---------------------------------------------------------------------------
// Boolean semiring (OR / AND)
// ---------------------------------------------------------------------------

/// The boolean semiring: weights record only whether a path exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Boolean(pub bool);

impl Semiring for Boolean {
    fn zero() -> Self {
        Boolean(false)
    }

    fn one() -> Self {
        Boolean(true)
    }

    fn plus(self, other: Self) -> Self {
        Boolean(self.0 || other.0)
    }

    fn times(self, other: Self) -> Self {
        Boolean(self.0 && other.0)
    }

    fn from_literal(value: f64) -> Self {
        Boolean(value != 0.0)
    }

    /// `plus` is idempotent, so any contributing term equals itself after
    /// factoring out the pool.
    fn divide(self, _base: Self) -> Self {
        self
    }
}

impl NaturalOrder for Boolean {
    /// An existing path is preferred over no path.
    fn natural_cmp(&self, other: &Self) -> Ordering {
        match (self.0, other.0) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => Ordering::Equal,
        }
    }
}

// ---------------------------------------------------------------------------
// Tropical semiring (min / +)
// ---------------------------------------------------------------------------

/// The tropical semiring: weights are costs, alternative paths take the
/// minimum, consecutive steps add. `zero` is positive infinity, `one` is 0.
///
/// Values are canonicalized at construction (`-0.0` becomes `0.0`) and both
/// equality and ordering go through [`f64::total_cmp`], so comparison during
/// minimization is exact and total. NaN weights are a caller contract
/// violation and are not checked for.
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Tropical(f64);

impl Tropical {
    pub fn new(value: f64) -> Self {
        // -0.0 == 0.0 numerically but not under total_cmp
        Tropical(if value == 0.0 { 0.0 } else { value })
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for Tropical {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Tropical {}

impl Semiring for Tropical {
    fn zero() -> Self {
        Tropical(f64::INFINITY)
    }

    fn one() -> Self {
        Tropical(0.0)
    }

    fn plus(self, other: Self) -> Self {
        match self.0.total_cmp(&other.0) {
            Ordering::Greater => other,
            _ => self,
        }
    }

    fn times(self, other: Self) -> Self {
        Tropical::new(self.0 + other.0)
    }

    fn from_literal(value: f64) -> Self {
        Tropical::new(value)
    }

    fn divide(self, base: Self) -> Self {
        // the pool is a min over terms including self, so base <= self and
        // a finite self always has a finite base
        if self.is_zero() { self } else { Tropical::new(self.0 - base.0) }
    }
}

impl NaturalOrder for Tropical {
    /// Lower cost is preferred.
    fn natural_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

// ---------------------------------------------------------------------------
// Probability semiring (+ / x)
// ---------------------------------------------------------------------------

/// The probability semiring: alternative paths add, consecutive steps
/// multiply. `zero` is 0.0, `one` is 1.0. Same canonicalization and exact
/// comparison rules as [`Tropical`].
#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Probability(f64);

impl Probability {
    pub fn new(value: f64) -> Self {
        Probability(if value == 0.0 { 0.0 } else { value })
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl PartialEq for Probability {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0) == Ordering::Equal
    }
}

impl Eq for Probability {}

impl Semiring for Probability {
    fn zero() -> Self {
        Probability(0.0)
    }

    fn one() -> Self {
        Probability(1.0)
    }

    fn plus(self, other: Self) -> Self {
        Probability::new(self.0 + other.0)
    }

    fn times(self, other: Self) -> Self {
        Probability::new(self.0 * other.0)
    }

    fn from_literal(value: f64) -> Self {
        Probability::new(value)
    }

    fn divide(self, base: Self) -> Self {
        // the pool is a sum over non-negative terms including self, so a
        // non-zero self has a non-zero base
        if self.is_zero() { self } else { Probability::new(self.0 / base.0) }
    }
}

impl NaturalOrder for Probability {
    /// Higher probability is preferred.
    fn natural_cmp(&self, other: &Self) -> Ordering {
        other.0.total_cmp(&self.0)
    }
}
