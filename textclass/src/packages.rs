/*! Which LaTeX packages and classes the local installation has.

Modules, cite engines and document classes list LaTeX prerequisites; whether they are met is
asked of a [`PackageOracle`]. [`PackageList`] answers from the `packages.lst` file written
during configuration.
*/

use std::collections::BTreeMap;
use log::{debug, info};
use crate::lexer::{LexCode, Lexer};
use crate::paths::SearchPaths;
use crate::utils::errors::LayoutError;

/// Answers whether a LaTeX package (`foo` or `foo.sty`) or class (`foo.cls`) is installed.
pub trait PackageOracle {
    fn is_available(&self,name:&str) -> bool;
}

/// Everything is available; for tests and for running without a configured installation.
pub struct AllAvailable;
impl PackageOracle for AllAvailable {
    fn is_available(&self,_:&str) -> bool { true }
}

/// The packages listed in `packages.lst`, with their optional version info.
#[derive(Clone,Debug,Default)]
pub struct PackageList {
    packages:BTreeMap<String,String>
}

impl PackageList {
    /// Reads `packages.lst` from the search roots, replacing what was known before.
    pub fn read(&mut self,paths:&SearchPaths) -> Result<(),LayoutError> {
        let file = paths.lib_file_search("","packages.lst","")
            .ok_or_else(|| LayoutError::CatalogNotFound("packages.lst".to_string()))?;
        let mut lex = Lexer::new();
        lex.set_file(&file)?;
        self.packages.clear();
        loop {
            match lex.lex() {
                LexCode::Feof => break,
                _ if lex.get_string().starts_with("!!") => { lex.eat_line(); }
                _ => {
                    let name = lex.get_string().to_string();
                    lex.eat_line();
                    self.insert(&name,lex.get_string().trim());
                }
            }
        }
        info!(target:"tclass","{} LaTeX packages available",self.packages.len());
        Ok(())
    }

    /// Registers a package, e.g. one found by other means.
    pub fn insert(&mut self,name:&str,version:&str) {
        self.packages.insert(strip_sty(name).to_string(),version.to_string());
    }
    /// The version string recorded for `name`; empty if none was recorded.
    pub fn version(&self,name:&str) -> Option<&str> {
        self.packages.get(strip_sty(name)).map(String::as_str)
    }
    pub fn len(&self) -> usize { self.packages.len() }
    pub fn is_empty(&self) -> bool { self.packages.is_empty() }
}

impl<S:AsRef<str>> FromIterator<S> for PackageList {
    fn from_iter<T:IntoIterator<Item=S>>(iter:T) -> Self {
        let mut ret = PackageList::default();
        for s in iter { ret.insert(s.as_ref(),"") }
        ret
    }
}

impl PackageOracle for PackageList {
    fn is_available(&self,name:&str) -> bool {
        if name.contains("->") {
            // converter prerequisites; converters are not tracked here
            debug!(target:"tclass","Assuming converter `{}' is available",name);
            return true
        }
        self.packages.contains_key(strip_sty(name))
    }
}

fn strip_sty(name:&str) -> &str { name.strip_suffix(".sty").unwrap_or(name) }
