/*! The session object owning the search paths and every catalog.

There are no process-wide registries: whoever needs document classes constructs a
[`Catalogs`], reads it once and passes it down.
*/

use std::path::Path;
use log::{info, warn};
use crate::citeengines::CiteEnginesList;
use crate::documentclass::{get_document_class, DocumentClass};
use crate::layoutfile::{LayoutFile, LayoutFileList};
use crate::modules::ModuleList;
use crate::packages::PackageList;
use crate::paths::SearchPaths;
use crate::reconfigure::{self, LibraryScan};
use crate::textclass::{ReadContext, ReturnValues, TextClass};
use crate::upgrade::LayoutUpgrader;
use crate::utils::errors::LayoutError;

pub struct Catalogs {
    pub paths:SearchPaths,
    pub classes:LayoutFileList,
    pub modules:ModuleList,
    pub engines:CiteEnginesList,
    pub packages:PackageList,
    upgrader:Option<Box<dyn LayoutUpgrader>>
}

impl Catalogs {
    /// Empty catalogs over `paths`; call [`read_all`](Self::read_all) to fill them.
    pub fn new(paths:SearchPaths) -> Self {
        Catalogs {
            paths, classes:LayoutFileList::default(), modules:ModuleList::default(),
            engines:CiteEnginesList::default(), packages:PackageList::default(), upgrader:None
        }
    }
    /// Uses `upgrader` for layout files in older formats.
    pub fn with_upgrader<U:LayoutUpgrader + 'static>(mut self,upgrader:U) -> Self {
        self.upgrader = Some(Box::new(upgrader));
        self
    }

    /// The context layout files are read with.
    pub fn context(&self) -> ReadContext<'_> {
        ReadContext { paths:&self.paths, upgrader:self.upgrader.as_deref() }
    }

    /** Reads `packages.lst`, `textclass.lst`, `lyxmodules.lst` and `lyxciteengines.lst`.
     Missing catalogs are logged and leave the respective catalog empty. Returns whether
     all of them were found.
    */
    pub fn read_all(&mut self) -> bool {
        let mut ok = true;
        if let Err(e) = self.packages.read(&self.paths) {
            warn!(target:"tclass","{}",e);
            ok = false
        }
        ok &= self.classes.read(&self.paths).is_ok();
        ok &= self.modules.read(&self.paths).is_ok();
        ok &= self.engines.read(&self.paths).is_ok();
        info!(target:"tclass","{} classes, {} modules, {} cite engines",self.classes.len(),self.modules.len(),self.engines.len());
        ok
    }

    /// Regenerates the catalogs in the user directory from the installed files and reads
    /// them again.
    pub fn reconfigure(&mut self) -> Result<LibraryScan,LayoutError> {
        let scan = reconfigure::reconfigure(&self.paths,&self.packages)?;
        self.classes = LayoutFileList::default();
        self.modules = ModuleList::default();
        self.engines = CiteEnginesList::default();
        self.classes.read(&self.paths)?;
        self.modules.read(&self.paths)?;
        self.engines.read(&self.paths)?;
        Ok(scan)
    }

    /// Loads the class `name`; see [`LayoutFileList::load`].
    pub fn load_class(&mut self,name:&str,buf_path:Option<&Path>) -> Result<&LayoutFile,LayoutError> {
        let ctx = ReadContext { paths:&self.paths, upgrader:self.upgrader.as_deref() };
        self.classes.load(name,buf_path,&ctx)
    }

    /// Registers and loads a class from a document's directory; see
    /// [`LayoutFileList::add_local_layout`].
    pub fn add_local_layout(&mut self,name:&str,dir:&Path) -> Option<String> {
        let ctx = ReadContext { paths:&self.paths, upgrader:self.upgrader.as_deref() };
        self.classes.add_local_layout(name,dir,&ctx)
    }

    /// Registers a placeholder for a class the document needs but the library lacks.
    pub fn add_empty_class(&mut self,name:&str) -> String {
        let ctx = ReadContext { paths:&self.paths, upgrader:self.upgrader.as_deref() };
        self.classes.add_empty_class(name,&ctx)
    }

    /// Loads `base` if necessary and builds the document class with `modules` and `engine`;
    /// see [`get_document_class`].
    pub fn document_class(&mut self,base:&str,modules:&[String],engine:Option<&str>,clone:bool)
        -> Result<DocumentClass,LayoutError> {
        self.load_class(base,None)?;
        let lf = self.classes.get(base).ok_or_else(|| LayoutError::UnknownClass(base.to_string()))?;
        Ok(get_document_class(lf,modules,engine,clone,&*self))
    }

    /// Syntax-checks local layout text.
    pub fn validate(&self,text:&str) -> ReturnValues {
        TextClass::validate(text,&self.context())
    }
}
