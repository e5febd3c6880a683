mod package_finder;

pub use package_finder::{load_blacklist, PackageFinder, PackageKind, PackageInput};
