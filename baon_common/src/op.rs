/// Generates the standard arithmetic trait implementations for integer newtypes.
///
/// Usage (from within this crate, on a tuple struct with one numeric field):
/// * `op!(binary Centavos, Add, add)` implements `Add<Centavos> for Centavos`.
/// * `op!(inplace Centavos, SubAssign, sub_assign)` implements the in-place variant.
/// * `op!(unary Centavos, Neg, neg)` implements the unary operator.
#[macro_export]
macro_rules! op {
    (binary $ty:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $ty {
            type Output = Self;

            fn $method(self, rhs: Self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0, rhs.0))
            }
        }
    };
    (inplace $ty:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $ty {
            fn $method(&mut self, rhs: Self) {
                std::ops::$trait::$method(&mut self.0, rhs.0)
            }
        }
    };
    (unary $ty:ty, $trait:ident, $method:ident) => {
        impl std::ops::$trait for $ty {
            type Output = Self;

            fn $method(self) -> Self::Output {
                Self(std::ops::$trait::$method(self.0))
            }
        }
    };
}
