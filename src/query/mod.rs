//! Closest-feature queries between convex patches.

pub use self::contact::Contact;
pub use self::feature::FeatureId;
pub use self::pair_query::BoundaryPolicy;

pub(crate) use self::pair_query::{query_pair, PairResult, QueryKind, QueryRequest, WalkCache};

mod closest_points;
mod contact;
mod exhaustive;
mod feature;
mod pair_query;
mod voronoi;
mod walk;
