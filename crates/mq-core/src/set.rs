//! Sets that can be negated.
//!
//! A negated set stands for the complement of its elements: every member of the
//! universe except those listed. The universe (everyone a provider could ever
//! return) is never enumerated; the operators below only ever touch the finite
//! element sets and track the sign.

use std::collections::HashSet;
use std::hash::Hash;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NegatableSet<T: Eq + Hash> {
    elements: HashSet<T>,
    negated: bool,
}

impl<T: Eq + Hash> Default for NegatableSet<T> {
    fn default() -> Self {
        Self {
            elements: HashSet::new(),
            negated: false,
        }
    }
}

impl<T: Eq + Hash> FromIterator<T> for NegatableSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            elements: iter.into_iter().collect(),
            negated: false,
        }
    }
}

impl<T: Eq + Hash + Clone> NegatableSet<T> {
    fn signed(elements: HashSet<T>, negated: bool) -> Self {
        Self { elements, negated }
    }

    pub fn elements(&self) -> &HashSet<T> {
        &self.elements
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// Membership with the sign applied.
    pub fn contains(&self, value: &T) -> bool {
        self.elements.contains(value) != self.negated
    }

    /// Complement: same elements, sign flipped.
    pub fn negate(&self) -> Self {
        Self::signed(self.elements.clone(), !self.negated)
    }

    pub fn intersect(&self, other: &Self) -> Self {
        match (self.negated, other.negated) {
            (false, false) => Self::signed(and(&self.elements, &other.elements), false),
            (false, true) => Self::signed(minus(&self.elements, &other.elements), false),
            (true, false) => Self::signed(minus(&other.elements, &self.elements), false),
            (true, true) => Self::signed(or(&self.elements, &other.elements), true),
        }
    }

    pub fn union(&self, other: &Self) -> Self {
        match (self.negated, other.negated) {
            (false, false) => Self::signed(or(&self.elements, &other.elements), false),
            (false, true) => Self::signed(minus(&other.elements, &self.elements), true),
            (true, false) => Self::signed(minus(&self.elements, &other.elements), true),
            (true, true) => Self::signed(and(&self.elements, &other.elements), true),
        }
    }

    /// `self - other`.
    pub fn difference(&self, other: &Self) -> Self {
        match (self.negated, other.negated) {
            (false, false) => Self::signed(minus(&self.elements, &other.elements), false),
            (false, true) => Self::signed(and(&self.elements, &other.elements), false),
            (true, false) => Self::signed(or(&self.elements, &other.elements), true),
            // ~A - ~B == ~A & B == B \ A
            (true, true) => Self::signed(minus(&other.elements, &self.elements), false),
        }
    }

    /// Exactly one negated operand negates the result; two cancel out.
    pub fn symmetric_difference(&self, other: &Self) -> Self {
        let elements = self
            .elements
            .symmetric_difference(&other.elements)
            .cloned()
            .collect();
        Self::signed(elements, self.negated != other.negated)
    }

    /// Resolve against a known universe; a negated set becomes
    /// `universe \ elements`.
    ///
    /// Only an approximation of the true complement: the real universe is
    /// unbounded.
    pub fn materialize<'a, I>(&self, universe: I) -> HashSet<T>
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        if !self.negated {
            return self.elements.clone();
        }
        universe
            .into_iter()
            .filter(|v| !self.elements.contains(*v))
            .cloned()
            .collect()
    }
}

fn and<T: Eq + Hash + Clone>(a: &HashSet<T>, b: &HashSet<T>) -> HashSet<T> {
    a.intersection(b).cloned().collect()
}

fn or<T: Eq + Hash + Clone>(a: &HashSet<T>, b: &HashSet<T>) -> HashSet<T> {
    a.union(b).cloned().collect()
}

fn minus<T: Eq + Hash + Clone>(a: &HashSet<T>, b: &HashSet<T>) -> HashSet<T> {
    a.difference(b).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(values: &[i64]) -> NegatableSet<i64> {
        values.iter().copied().collect()
    }

    /// Every sign combination of A={1,2,3}, B={2,3,4}.
    fn pairs() -> Vec<(NegatableSet<i64>, NegatableSet<i64>)> {
        let a = set(&[1, 2, 3]);
        let b = set(&[2, 3, 4]);
        vec![
            (a.clone(), b.clone()),
            (a.clone(), b.negate()),
            (a.negate(), b.clone()),
            (a.negate(), b.negate()),
        ]
    }

    #[test]
    fn positive_operands() {
        let (a, b) = (set(&[1, 2, 3]), set(&[2, 3, 4]));
        assert_eq!(a.intersect(&b), set(&[2, 3]));
        assert_eq!(a.union(&b), set(&[1, 2, 3, 4]));
        assert_eq!(a.difference(&b), set(&[1]));
        assert_eq!(a.symmetric_difference(&b), set(&[1, 4]));
    }

    #[test]
    fn sign_table() {
        let (a, b) = (set(&[1, 2, 3]), set(&[2, 3, 4]));

        assert_eq!(a.intersect(&b.negate()), set(&[1]));
        assert_eq!(a.negate().intersect(&b), set(&[4]));
        assert_eq!(a.negate().intersect(&b.negate()), set(&[1, 2, 3, 4]).negate());

        assert_eq!(a.union(&b.negate()), set(&[4]).negate());
        assert_eq!(a.negate().union(&b), set(&[1]).negate());
        assert_eq!(a.negate().union(&b.negate()), set(&[2, 3]).negate());

        assert_eq!(a.difference(&b.negate()), set(&[2, 3]));
        assert_eq!(a.negate().difference(&b), set(&[1, 2, 3, 4]).negate());
        assert_eq!(a.negate().difference(&b.negate()), set(&[4]));

        assert_eq!(a.symmetric_difference(&b.negate()), set(&[1, 4]).negate());
        assert_eq!(a.negate().symmetric_difference(&b), set(&[1, 4]).negate());
        assert_eq!(a.negate().symmetric_difference(&b.negate()), set(&[1, 4]));
    }

    #[test]
    fn commutative_operators() {
        for (a, b) in pairs() {
            assert_eq!(a.intersect(&b), b.intersect(&a));
            assert_eq!(a.union(&b), b.union(&a));
            assert_eq!(a.symmetric_difference(&b), b.symmetric_difference(&a));
        }
        let (a, b) = (set(&[1, 2, 3]), set(&[2, 3, 4]));
        assert_ne!(a.difference(&b), b.difference(&a));
    }

    #[test]
    fn double_negation_is_identity() {
        for (a, _) in pairs() {
            assert_eq!(a.negate().negate(), a);
            assert_eq!(a.negate().elements(), a.elements());
        }
    }

    #[test]
    fn de_morgan() {
        for (a, b) in pairs() {
            assert_eq!(a.negate().intersect(&b.negate()), a.union(&b).negate());
            assert_eq!(a.negate().union(&b.negate()), a.intersect(&b).negate());
        }
    }

    #[test]
    fn difference_is_intersection_with_complement() {
        for (a, b) in pairs() {
            assert_eq!(a.difference(&b), a.intersect(&b.negate()));
        }
    }

    #[test]
    fn symmetric_difference_is_union_of_differences() {
        for (a, b) in pairs() {
            let expected = a.difference(&b).union(&b.difference(&a));
            assert_eq!(a.symmetric_difference(&b), expected);
        }
    }

    #[test]
    fn results_agree_with_pointwise_membership() {
        for (a, b) in pairs() {
            for v in 0..=6 {
                let (x, y) = (a.contains(&v), b.contains(&v));
                assert_eq!(a.intersect(&b).contains(&v), x && y);
                assert_eq!(a.union(&b).contains(&v), x || y);
                assert_eq!(a.difference(&b).contains(&v), x && !y);
                assert_eq!(a.symmetric_difference(&b).contains(&v), x != y);
            }
        }
    }

    #[test]
    fn negated_empty_set_is_the_universe() {
        let everyone = NegatableSet::<i64>::default().negate();
        assert!(everyone.contains(&42));
        assert!(everyone.elements().is_empty());
        assert_eq!(everyone.materialize(&[1, 2]), HashSet::from([1, 2]));
    }

    #[test]
    fn materialize_against_known_universe() {
        let universe = [1, 2, 3, 4, 5];
        assert_eq!(set(&[1, 2]).materialize(&universe), HashSet::from([1, 2]));
        assert_eq!(
            set(&[1, 2]).negate().materialize(&universe),
            HashSet::from([3, 4, 5])
        );
    }
}
