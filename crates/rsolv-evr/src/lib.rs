//! RPM version handling for the rsolv resolver
//!
//! This crate provides `epoch:version-release` parsing, rpm's segment-wise version
//! ordering and the `name op evr` dependency relations that packages provide, require,
//! conflict with and obsolete.
//!
//! ```
//! use rsolv_evr::{Comparator, Relation};
//!
//! assert!(Comparator::greater_than("1:1.0-1", "2.0-1"));
//!
//! let requirement: Relation = "httpd >= 2.4".parse().unwrap();
//! let provide: Relation = "httpd = 2.4.6-1".parse().unwrap();
//! assert!(requirement.intersects(&provide));
//! ```

mod comparator;
mod evr;
mod operator;
mod relation;

pub use comparator::Comparator;
pub use evr::{rpmvercmp, Evr, EvrError};
pub use operator::{InvalidOperatorError, Operator};
pub use relation::Relation;
