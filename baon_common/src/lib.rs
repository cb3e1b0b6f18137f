mod money;

pub mod helpers;
pub mod op;
mod secret;

pub use money::{Centavos, CentavosConversionError, PESO_CURRENCY_CODE};
pub use secret::Secret;
