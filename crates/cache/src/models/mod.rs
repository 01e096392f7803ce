mod package;

pub use self::package::FileStamp;
pub(crate) use self::package::{PackageRow, path_str};
