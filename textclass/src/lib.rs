/*! Reading and resolving LyX-style document classes.

The crate parses `.layout`, `.module` and `.citeengine` description files with a small
keyword-driven [`Lexer`](lexer::Lexer) into a [`TextClass`](textclass::TextClass), keeps
catalogs of the available classes ([`LayoutFileList`](layoutfile::LayoutFileList)), modules
([`ModuleList`](modules::ModuleList)) and citation engines
([`CiteEnginesList`](citeengines::CiteEnginesList)), and repairs module selections against
a base class ([`LayoutModuleList`](modules::LayoutModuleList)).

Everything hangs off an explicitly constructed [`Catalogs`](catalogs::Catalogs) session:
```no_run
use textclass::prelude::*;
let mut catalogs = Catalogs::new(SearchPaths::from_env());
catalogs.read_all();
let base = catalogs.classes.default_baseclass().unwrap_or_default();
let mut modules = LayoutModuleList::default();
if catalogs.load_class(&base,None).is_ok() {
    let lay = catalogs.classes.get(&base).unwrap();
    modules.adapt_to_base_class(lay,&catalogs.modules,&[]);
}
let doc = catalogs.document_class(&base,&modules,None,false).unwrap();
println!("{} styles",doc.layouts().len());
```
*/

pub mod utils;
pub mod lexer;
pub mod paths;
pub mod fonts;
pub mod layout;
pub mod insetlayout;
pub mod counters;
pub mod floats;
pub mod citations;
pub mod textclass;
pub mod documentclass;
pub mod packages;
pub mod layoutfile;
pub mod modules;
pub mod citeengines;
pub mod upgrade;
pub mod reconfigure;
pub mod catalogs;

#[doc(hidden)]
pub mod tests;

/// The layout file format this crate reads natively; older files go through a
/// [`LayoutUpgrader`](upgrade::LayoutUpgrader).
pub const LAYOUT_FORMAT: i32 = 60;

pub mod prelude {
    pub use crate::catalogs::Catalogs;
    pub use crate::paths::SearchPaths;
    pub use crate::lexer::{Lexer,LexCode};
    pub use crate::textclass::{TextClass,ReadType,ReturnValues,ReadContext};
    pub use crate::documentclass::{DocumentClass,get_document_class};
    pub use crate::layoutfile::{LayoutFile,LayoutFileList};
    pub use crate::modules::{LyXModule,ModuleList,LayoutModuleList};
    pub use crate::citeengines::{LyXCiteEngine,CiteEnginesList};
    pub use crate::citations::CiteEngineType;
    pub use crate::packages::{PackageOracle,PackageList};
    pub use crate::utils::errors::LayoutError;
}
