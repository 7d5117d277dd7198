use std::cmp::Ordering;
use std::fmt;

/// Total order used to place elements in a skip list.
///
/// Two elements that compare `Equal` are the same element for the list: an
/// insert of the second one finds the first and does not add anything.
pub trait Comparator<T>: Send + Sync {
    fn compare(&self, a: &T, b: &T) -> Ordering;

    #[inline]
    fn less(&self, a: &T, b: &T) -> bool {
        self.compare(a, b) == Ordering::Less
    }
}

/// Orders elements by their `Ord` implementation.
#[derive(Clone, Copy, Default)]
pub struct NaturalOrder;

impl<T: Ord> Comparator<T> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        a.cmp(b)
    }
}

impl fmt::Debug for NaturalOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("NaturalOrder")
    }
}

/// Orders by the reverse of another comparator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Reverse<C>(pub C);

impl<T, C: Comparator<T>> Comparator<T> for Reverse<C> {
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self.0.compare(b, a)
    }
}

impl<T, F> Comparator<T> for F
where
    F: Fn(&T, &T) -> Ordering + Send + Sync,
{
    #[inline]
    fn compare(&self, a: &T, b: &T) -> Ordering {
        self(a, b)
    }
}
