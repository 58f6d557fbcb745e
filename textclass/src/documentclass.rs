/*! The class a document actually uses: a copy of its base class with the document's modules
and cite engine layered on top.

[`get_document_class`] is the one place where a [`DocumentClass`] is made. Problems with the
requested modules or engine are warnings, never errors; a document with a missing module is
still shown, just without that module's styles.
*/

use std::ops::Deref;
use log::{debug, warn};
use crate::catalogs::Catalogs;
use crate::citations::CiteEngineType;
use crate::insetlayout::{self, InsetLayout};
use crate::layout::{Layout, NOT_IN_TOC};
use crate::textclass::{ReadType, TextClass};

/// Used for bibliography entry types the class declares no `CiteFormat` for.
pub const DEFAULT_CITE_FORMAT: &str = "{%author%[[%author%, ]][[{%editor%[[%editor%, ed., ]]}]]}\
    \"%title%\"{%journal%[[, {!<i>!}%journal%{!</i>!}]][[{%publisher%[[, %publisher%]]\
    [[{%institution%[[, %institution%]]}]]}]]}{%year%[[ (%year%)]]}{%pages%[[, %pages%]]}.";

/// A fully assembled class; read-only once built.
#[derive(Clone,Debug)]
pub struct DocumentClass {
    tclass:TextClass,
    modules:Vec<String>,
    engine:Option<String>
}

impl Deref for DocumentClass {
    type Target = TextClass;
    fn deref(&self) -> &TextClass { &self.tclass }
}

impl DocumentClass {
    /// The modules that were requested, including those that could not be read.
    pub fn modules(&self) -> &[String] { &self.modules }
    pub fn cite_engine(&self) -> Option<&str> { self.engine.as_deref() }

    /// Whether some style is written out as `\lay` / `\begin{lay}`.
    pub fn has_latex_layout(&self,lay:&str) -> bool {
        self.layout_from_latex_name(lay).is_some()
    }
    pub fn layout_from_latex_name(&self,lay:&str) -> Option<&Layout> {
        self.layouts().iter().find(|l| l.latexname == lay)
    }

    /// The numbered style highest up in the table of contents (usually `Part` or
    /// `Chapter`), or the default style if no style is numbered and in the TOC.
    pub fn toc_layout(&self) -> Option<&Layout> {
        self.layouts().iter()
            .filter(|l| l.toclevel != NOT_IN_TOC && l.toclevel >= 0 && !l.counter.is_empty())
            .min_by_key(|l| l.toclevel)
            .or_else(|| self.default_layout())
    }

    /// The inset layout `name`, following `ObsoletedBy`; the plain inset layout if unknown.
    pub fn inset_layout(&self,name:&str) -> &InsetLayout {
        insetlayout::lookup(self.inset_layouts(),name)
    }

    /// The citation format for a bibliography entry type, falling back to the `default`
    /// entry and then to [`DEFAULT_CITE_FORMAT`].
    pub fn cite_format_or_default(&self,t:CiteEngineType,entry:&str) -> &str {
        self.cite_format(t,entry).or_else(|| self.cite_format(t,"default")).unwrap_or(DEFAULT_CITE_FORMAT)
    }
}

/** Builds the document class for `base` with `modules` and the cite `engine` applied, in
 that order. Modules are looked up in the `layouts` directories, the engine in the
 `citeengines` directories of the search paths.

 With `clone` set (a throw-away copy, e.g. for a preview), missing modules and engines are
 not reported.
*/
pub fn get_document_class(base:&TextClass,modules:&[String],engine:Option<&str>,clone:bool,
                          catalogs:&Catalogs) -> DocumentClass {
    let ctx = catalogs.context();
    let mut tclass = base.clone();
    for module in modules {
        let Some(lm) = catalogs.modules.get(module) else {
            if !clone {
                warn!(target:"tclass","The module {} has been requested by this document but has not been found \
                    in the list of available modules. If you recently installed it, you probably need to reconfigure.",module);
            }
            continue
        };
        if !lm.is_available(&catalogs.packages) && !clone {
            warn!(target:"tclass","The module {} requires a package that is not available in your LaTeX installation, \
                or a converter that you have not installed. LaTeX output may not be possible. Missing prerequisites: {}",
                module,lm.prerequisites().join(", "));
        }
        let Some(file) = catalogs.paths.lib_file_search("layouts",lm.filename(),"") else {
            warn!(target:"tclass","Read Error: Could not read module {} ({})",module,lm.filename());
            continue
        };
        debug!(target:"tclass","Applying module {} from {}",module,file.display());
        if let Err(e) = tclass.read_file(&file,ReadType::Module,&ctx) {
            warn!(target:"tclass","Read Error: Could not read module {}: {}",module,e);
        }
    }

    if let Some(name) = engine.filter(|e| !e.is_empty()) {
        match catalogs.engines.get(name) {
            None => if !clone {
                warn!(target:"tclass","The cite engine {} has been requested by this document but has not been found \
                    in the list of available engines. If you recently installed it, you probably need to reconfigure.",name);
            }
            Some(ce) => {
                if !ce.is_available(&catalogs.packages) && !clone {
                    warn!(target:"tclass","The cite engine {} requires a package that is not available in your LaTeX \
                        installation. Missing prerequisites: {}",name,ce.prerequisites().join(", "));
                }
                match catalogs.paths.lib_file_search("citeengines",ce.filename(),"") {
                    None => warn!(target:"tclass","Read Error: Could not read cite engine {} ({})",name,ce.filename()),
                    Some(file) => if let Err(e) = tclass.read_file(&file,ReadType::CiteEngine,&ctx) {
                        warn!(target:"tclass","Read Error: Could not read cite engine {}: {}",name,e);
                    }
                }
            }
        }
    }

    DocumentClass { tclass, modules:modules.to_vec(), engine:engine.map(ToString::to_string) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paths::SearchPaths;
    use crate::textclass::{ReadContext, ReturnValues};

    fn document(body:&str) -> DocumentClass {
        let paths = SearchPaths::default();
        let mut tc = TextClass::new("book");
        assert_eq!(tc.read_str(&format!("Format 60\nProvides stdinsets 1\n{}",body),ReadType::BaseClass,
            &ReadContext::new(&paths)),ReturnValues::Ok);
        get_document_class(&tc,&[],None,false,&Catalogs::new(paths))
    }

    #[test]
    fn toc_layout_is_the_top_numbered_style() {
        let dc = document("DefaultStyle Standard\nStyle Standard\nEnd\n\
            Style Section\n  LatexType Command\n  LatexName section\n  TocLevel 1\n  LabelCounter section\nEnd\n\
            Style Chapter\n  LatexType Command\n  LatexName chapter\n  TocLevel 0\n  LabelCounter chapter\nEnd\n\
            Style Part*\n  LatexType Command\n  LatexName part*\n  TocLevel -1\nEnd\n");
        assert_eq!(dc.toc_layout().map(|l| l.name.as_str()),Some("Chapter"));
        assert!(dc.has_latex_layout("section"));
        assert!(!dc.has_latex_layout("subsection"));
        assert_eq!(dc.layout_from_latex_name("chapter").map(|l| l.name.as_str()),Some("Chapter"));
        assert!(dc.modules().is_empty());
        assert_eq!(dc.cite_engine(),None);

        let plain = document("Style Standard\nEnd\n");
        assert_eq!(plain.toc_layout().map(|l| l.name.as_str()),Some("Standard"));
    }

    #[test]
    fn cite_format_fallbacks() {
        let dc = document("Style Standard\nEnd\nCiteFormat default\n  article %author%: %title%\nEnd\n");
        assert_eq!(dc.cite_format_or_default(CiteEngineType::NUMERICAL,"article"),"%author%: %title%");
        assert_eq!(dc.cite_format_or_default(CiteEngineType::AUTHORYEAR,"book"),DEFAULT_CITE_FORMAT);
        let dc = document("Style Standard\nEnd\nCiteFormat default\n  default %title%\nEnd\n");
        assert_eq!(dc.cite_format_or_default(CiteEngineType::AUTHORYEAR,"book"),"%title%");
    }

    #[test]
    fn unknown_modules_are_skipped() {
        let paths = SearchPaths::default();
        let mut tc = TextClass::new("article");
        tc.read_str("Format 60\nProvides stdinsets 1\nStyle Standard\nEnd\n",ReadType::BaseClass,&ReadContext::new(&paths));
        let dc = get_document_class(&tc,&["nonexistent".to_string()],Some("nope"),false,&Catalogs::new(paths));
        assert_eq!(dc.layouts().len(),tc.layouts().len());
        assert_eq!(dc.modules(),&["nonexistent".to_string()]);
        assert_eq!(dc.cite_engine(),Some("nope"));
        assert!(std::ptr::eq(dc.inset_layout("Flex:Nothing"),InsetLayout::plain()));
    }
}
