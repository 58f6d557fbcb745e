/*! Error types.

   Hard failures (unreadable files, missing catalogs, fatal parse errors) are reported as
   [`LayoutError`]s. Module and engine consistency problems are never errors; they are
   repaired and logged instead.
 */
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug,Error)]
pub enum LayoutError {
    /// A file exists (or was expected to) but could not be read.
    #[error("cannot read `{}`: {source}",path.display())]
    Io { path:PathBuf, #[source] source:std::io::Error },
    /// `textclass.lst`, `lyxmodules.lst` etc. could not be found in any search root.
    #[error("unable to find catalog file `{0}`; try reconfiguring")]
    CatalogNotFound(String),
    /// The document class is not registered in the [`LayoutFileList`](crate::layoutfile::LayoutFileList).
    #[error("document class `{0}` does not exist")]
    UnknownClass(String),
    /// A layout, module or cite engine file failed to parse.
    #[error("error reading `{0}`")]
    Parse(String),
    /// An `Input` directive named a file that is not in the search path.
    #[error("could not find input file `{0}`")]
    MissingInput(String),
    /// An old-format file could not be brought up to the current format.
    #[error("unable to convert `{0}` to layout format {fmt}",fmt = crate::LAYOUT_FORMAT)]
    Conversion(String),
}

impl LayoutError {
    pub(crate) fn io<P:Into<PathBuf>>(path:P,source:std::io::Error) -> Self {
        LayoutError::Io { path:path.into(), source }
    }
}
