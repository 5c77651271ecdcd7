//! Sheet localization and rectification.
//!
//! [`SheetLocator`] finds the printed sheet frame in a photograph and reduces
//! it to a [`omr_core::Quad`]; [`Rectifier`] resolves which corner is the
//! sheet's top-left from the orientation marker and resamples the sheet into
//! its fixed canonical frame.

mod binarize;
mod components;
mod locator;
mod rectify;

pub use binarize::{adaptive_threshold, downsample_box};
pub use components::{connected_components, Component};
pub use locator::{LocateError, LocatorParams, SheetLocation, SheetLocator};
pub use rectify::{CanonicalImage, OrientationEstimate, OrientationParams, RectifyError, Rectifier};
