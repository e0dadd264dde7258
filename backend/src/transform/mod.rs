//! Matrix transformations.
//!
//! - Render: echo and transpose of a materialized matrix
//! - Reduce: flatten, sum and product folds over a stream of cells

pub mod reduce;
pub mod render;

pub use reduce::{reduce_matrix, Flatten, Product, Reducer, Sum};
pub use render::{echo, invert};
