//! Polynomial secret sharing
//!
//! Share `i` is the evaluation of the polynomial at `x = i + 1`, so no share
//! index ever evaluates at zero. Recovery interpolates back to `x = 0`.

use rand_core::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::group::{encoding, Point, Scalar};
use crate::{Error, Result};

/// A private share: the evaluation of a private polynomial at one index
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "S: Scalar", deserialize = "S: Scalar"))]
pub struct PriShare<S> {
    pub index: u32,
    #[serde(with = "encoding::scalar")]
    pub value: S,
}

/// A public share: the evaluation of a public polynomial at one index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "P: Point", deserialize = "P: Point"))]
pub struct PubShare<P> {
    pub index: u32,
    #[serde(with = "encoding::point")]
    pub value: P,
}

fn x_coordinate<S: Scalar>(index: u32) -> S {
    S::from_u64(u64::from(index) + 1)
}

/// Secret-sharing polynomial of degree `threshold - 1`
#[derive(Clone, PartialEq)]
pub struct PriPoly<S> {
    coeffs: Vec<S>,
}

impl<S> std::fmt::Debug for PriPoly<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriPoly")
            .field("threshold", &self.coeffs.len())
            .finish_non_exhaustive()
    }
}

impl<S: Scalar> PriPoly<S> {
    /// Create a random polynomial with `threshold` coefficients. The constant
    /// term is `secret` when given, random otherwise.
    pub fn new<R: RngCore + CryptoRng + ?Sized>(
        threshold: usize,
        secret: Option<S>,
        rng: &mut R,
    ) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::InvalidConfig("threshold must be at least 1".into()));
        }

        let mut coeffs = Vec::with_capacity(threshold);
        coeffs.push(secret.unwrap_or_else(|| S::pick(rng)));
        for _ in 1..threshold {
            coeffs.push(S::pick(rng));
        }

        Ok(Self { coeffs })
    }

    pub fn from_coefficients(coeffs: Vec<S>) -> Result<Self> {
        if coeffs.is_empty() {
            return Err(Error::InvalidConfig("polynomial without coefficients".into()));
        }
        Ok(Self { coeffs })
    }

    pub fn threshold(&self) -> usize {
        self.coeffs.len()
    }

    /// The shared secret, coefficient 0
    pub fn secret(&self) -> S {
        self.coeffs[0]
    }

    pub fn coefficients(&self) -> &[S] {
        &self.coeffs
    }

    /// Evaluate the share of node `index`
    pub fn eval(&self, index: u32) -> PriShare<S> {
        let x = x_coordinate::<S>(index);
        let value = self
            .coeffs
            .iter()
            .rev()
            .fold(S::zero(), |acc, coeff| acc * x + *coeff);
        PriShare { index, value }
    }

    /// Shares for nodes `0..n`
    pub fn shares(&self, n: u32) -> Vec<PriShare<S>> {
        (0..n).map(|i| self.eval(i)).collect()
    }

    /// Commit to every coefficient with `base`
    pub fn commit<P: Point<Scalar = S>>(&self, base: &P) -> PubPoly<P> {
        let commits = self.coeffs.iter().map(|c| base.scale(c)).collect();
        PubPoly {
            base: base.clone(),
            commits,
        }
    }

    /// Coefficient-wise sum; both polynomials must have the same threshold
    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.threshold() != other.threshold() {
            return Err(Error::PolynomialMismatch(format!(
                "private polynomials of length {} and {}",
                self.threshold(),
                other.threshold()
            )));
        }
        let coeffs = self
            .coeffs
            .iter()
            .zip(&other.coeffs)
            .map(|(a, b)| *a + *b)
            .collect();
        Ok(Self { coeffs })
    }
}

/// Commitments to the coefficients of a private polynomial
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "P: Point", deserialize = "P: Point"))]
pub struct PubPoly<P> {
    #[serde(with = "encoding::point")]
    base: P,
    #[serde(with = "encoding::points")]
    commits: Vec<P>,
}

impl<P: Point> PubPoly<P> {
    pub fn new(base: P, commits: Vec<P>) -> Self {
        Self { base, commits }
    }

    pub fn base(&self) -> &P {
        &self.base
    }

    pub fn commits(&self) -> &[P] {
        &self.commits
    }

    pub fn threshold(&self) -> usize {
        self.commits.len()
    }

    /// The public key, `base * secret`
    pub fn commit(&self) -> P {
        self.commits.first().cloned().unwrap_or_else(P::identity)
    }

    /// Evaluate the public share of node `index`
    pub fn eval(&self, index: u32) -> PubShare<P> {
        let x = x_coordinate::<P::Scalar>(index);
        let value = self
            .commits
            .iter()
            .rev()
            .fold(P::identity(), |acc, commit| acc.scale(&x) + commit.clone());
        PubShare { index, value }
    }

    /// Homomorphic sum of two public polynomials
    pub fn add(&self, other: &Self) -> Result<Self> {
        if self.threshold() != other.threshold() {
            return Err(Error::PolynomialMismatch(format!(
                "public polynomials of length {} and {}",
                self.threshold(),
                other.threshold()
            )));
        }
        if self.base != other.base {
            return Err(Error::PolynomialMismatch(
                "public polynomials with different bases".into(),
            ));
        }
        let commits = self
            .commits
            .iter()
            .zip(&other.commits)
            .map(|(a, b)| a.clone() + b.clone())
            .collect();
        Ok(Self {
            base: self.base.clone(),
            commits,
        })
    }

    /// Returns true iff `share` lies on the committed polynomial
    pub fn check(&self, share: &PriShare<P::Scalar>) -> bool {
        self.base.scale(&share.value) == self.eval(share.index).value
    }
}

/// Keep shares with index below `n`, drop repeated indices, order by index
/// and take the first `t`. Every caller with the same input ends up with the
/// same subset.
fn select_shares<T, F>(shares: &[T], index_of: F, t: usize, n: usize) -> Result<Vec<&T>>
where
    F: Fn(&T) -> u32,
{
    if t == 0 {
        return Err(Error::InvalidConfig("threshold must be at least 1".into()));
    }

    let mut selected: Vec<&T> = shares
        .iter()
        .filter(|s| (index_of(s) as usize) < n)
        .collect();
    selected.sort_by_key(|s| index_of(s));
    selected.dedup_by_key(|s| index_of(s));

    if selected.len() < t {
        return Err(Error::InsufficientShares {
            required: t,
            got: selected.len(),
        });
    }
    selected.truncate(t);
    Ok(selected)
}

/// Lagrange basis polynomial `i` evaluated at zero:
/// `prod_{j != i} x_j / (x_j - x_i)`
fn lagrange_at_zero<S: Scalar>(xs: &[S], i: usize) -> Result<S> {
    let mut num = S::one();
    let mut den = S::one();
    for (j, xj) in xs.iter().enumerate() {
        if j == i {
            continue;
        }
        num = num * *xj;
        den = den * (*xj - xs[i]);
    }
    let inv = den
        .inverse()
        .ok_or_else(|| Error::InvalidConfig("repeated interpolation point".into()))?;
    Ok(num * inv)
}

/// Coefficients of the Lagrange basis polynomial `i`
fn lagrange_basis<S: Scalar>(xs: &[S], i: usize) -> Result<Vec<S>> {
    let mut coeffs = vec![S::one()];
    let mut den = S::one();
    for (j, xj) in xs.iter().enumerate() {
        if j == i {
            continue;
        }
        // multiply by (x - x_j)
        let mut next = vec![S::zero(); coeffs.len() + 1];
        for (k, c) in coeffs.iter().enumerate() {
            next[k + 1] = next[k + 1] + *c;
            next[k] = next[k] - *c * *xj;
        }
        coeffs = next;
        den = den * (xs[i] - *xj);
    }
    let inv = den
        .inverse()
        .ok_or_else(|| Error::InvalidConfig("repeated interpolation point".into()))?;
    Ok(coeffs.into_iter().map(|c| c * inv).collect())
}

/// Recover the secret from at least `t` shares with indices in `[0, n)`
pub fn recover_secret<S: Scalar>(shares: &[PriShare<S>], t: usize, n: usize) -> Result<S> {
    let selected = select_shares(shares, |s| s.index, t, n)?;
    let xs: Vec<S> = selected.iter().map(|s| x_coordinate(s.index)).collect();

    let mut acc = S::zero();
    for (i, share) in selected.iter().enumerate() {
        acc = acc + share.value * lagrange_at_zero(&xs, i)?;
    }
    Ok(acc)
}

/// Recover the committed secret `base * s` from at least `t` public shares
pub fn recover_commit<P: Point>(shares: &[PubShare<P>], t: usize, n: usize) -> Result<P> {
    let selected = select_shares(shares, |s| s.index, t, n)?;
    let xs: Vec<P::Scalar> = selected.iter().map(|s| x_coordinate(s.index)).collect();

    let mut acc = P::identity();
    for (i, share) in selected.iter().enumerate() {
        acc = acc + share.value.scale(&lagrange_at_zero(&xs, i)?);
    }
    Ok(acc)
}

/// Recover the whole private polynomial from at least `t` shares
pub fn recover_pri_poly<S: Scalar>(shares: &[PriShare<S>], t: usize, n: usize) -> Result<PriPoly<S>> {
    let selected = select_shares(shares, |s| s.index, t, n)?;
    let xs: Vec<S> = selected.iter().map(|s| x_coordinate(s.index)).collect();

    let mut coeffs = vec![S::zero(); t];
    for (i, share) in selected.iter().enumerate() {
        for (k, b) in lagrange_basis(&xs, i)?.into_iter().enumerate() {
            coeffs[k] = coeffs[k] + b * share.value;
        }
    }
    PriPoly::from_coefficients(coeffs)
}

/// Recover the whole public polynomial from at least `t` public shares
pub fn recover_pub_poly<P: Point>(
    base: &P,
    shares: &[PubShare<P>],
    t: usize,
    n: usize,
) -> Result<PubPoly<P>> {
    let selected = select_shares(shares, |s| s.index, t, n)?;
    let xs: Vec<P::Scalar> = selected.iter().map(|s| x_coordinate(s.index)).collect();

    let mut commits = vec![P::identity(); t];
    for (i, share) in selected.iter().enumerate() {
        for (k, b) in lagrange_basis(&xs, i)?.into_iter().enumerate() {
            commits[k] = commits[k].clone() + share.value.scale(&b);
        }
    }
    Ok(PubPoly::new(base.clone(), commits))
}
