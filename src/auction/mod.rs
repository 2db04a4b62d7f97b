// Live-auction core: the random non-repeating draw and the sale finalizer.

pub mod draw;
pub mod sale;
