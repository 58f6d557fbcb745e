/*! The catalog of available document classes.

[`LayoutFileList::read`] registers one unloaded [`LayoutFile`] stub per line of
`textclass.lst`; the layout bodies are only parsed when a class is
[`load`](LayoutFile::load)ed.

**Example:**
```rust
use textclass::layoutfile::LayoutFileList;
let mut classes = LayoutFileList::default();
classes.read_catalog_str("article\tarticle\t\"Article\"\t1\nbook book \"Book (Standard Class)\" false\n");
assert!(classes.have_class("article"));
assert_eq!(classes.default_baseclass().as_deref(),Some("article"));
assert!(!classes.get("book").unwrap().is_tex_class_available());
```
*/

use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use path_dedot::ParseDot;
use regex::Regex;
use crate::LAYOUT_FORMAT;
use crate::lexer::{LexCode, Lexer};
use crate::paths::{file_search, SearchPaths};
use crate::textclass::{ReadContext, ReadType, ReturnValues, TextClass};
use crate::utils::errors::LayoutError;
use crate::utils::quote;

lazy_static! {
    static ref DECLARE_CLASS : Regex = Regex::new(
        r"^#\s*\\Declare(?:LaTeX|DocBook)Class\s*(?:\[([^,\]]*)(?:,[^\]]*)?\])?\s*\{(.*)\}\s*$"
    ).unwrap();
    static ref DECLARE_CATEGORY : Regex = Regex::new(r"^#\s*\\DeclareCategory\{(.*)\}\s*$").unwrap();
}

/// A document class as registered in the catalog; its [`TextClass`] is filled on
/// [`load`](Self::load).
#[derive(Clone,Debug)]
pub struct LayoutFile {
    tclass:TextClass,
    tex_class_avail:bool,
    /// Where a local layout was found; system classes are looked up in the search paths.
    path:Option<PathBuf>
}

impl LayoutFile {
    /// An unloaded stub.
    pub fn new(filename:&str,latexname:&str,description:&str,prerequisites:&str,category:&str,avail:bool) -> Self {
        let mut tclass = TextClass::new(filename);
        tclass.latexname = latexname.to_string();
        tclass.description = description.to_string();
        tclass.prerequisites = prerequisites.to_string();
        tclass.category = category.to_string();
        LayoutFile { tclass, tex_class_avail:avail, path:None }
    }

    /// Whether the LaTeX class this layout is for is installed.
    pub fn is_tex_class_available(&self) -> bool { self.tex_class_avail }
    /// The layout file of a local class.
    pub fn local_path(&self) -> Option<&Path> { self.path.as_deref() }

    /// Parses the class unless that has been done already. `buf_path` is searched before the
    /// library (a file, or a directory containing `<name>.layout`).
    pub fn load(&mut self,buf_path:Option<&Path>,ctx:&ReadContext) -> Result<(),LayoutError> {
        let path = buf_path.or(self.path.as_deref()).map(Path::to_path_buf);
        self.tclass.load(path.as_deref(),ctx)
    }

    /// A fresh unloaded copy carrying only the catalog data.
    fn stub(&self) -> LayoutFile {
        let mut ret = LayoutFile::new(self.name(),self.latexname(),self.description(),
            self.prerequisites(),self.category(),self.tex_class_avail);
        ret.path.clone_from(&self.path);
        ret
    }

    /// The `textclass.lst` line describing this class.
    pub fn to_catalog_record(&self) -> String {
        format!("{} {} {} {} {} {}",quote(self.name()),quote(self.latexname()),quote(self.description()),
            quote(if self.tex_class_avail {"true"} else {"false"}),quote(self.prerequisites()),quote(self.category()))
    }
}

impl Deref for LayoutFile {
    type Target = TextClass;
    fn deref(&self) -> &TextClass { &self.tclass }
}
impl DerefMut for LayoutFile {
    fn deref_mut(&mut self) -> &mut TextClass { &mut self.tclass }
}

/// All known document classes, by name.
#[derive(Clone,Debug,Default)]
pub struct LayoutFileList {
    classmap:BTreeMap<String,LayoutFile>
}

/// The older name of [`LayoutFileList`]; same catalog, same contract.
pub type BaseClassList = LayoutFileList;

impl LayoutFileList {
    /// Reads `textclass.lst` from the search roots. An empty catalog is tolerated; the user
    /// may still have to reconfigure.
    pub fn read(&mut self,paths:&SearchPaths) -> Result<(),LayoutError> {
        let Some(file) = paths.lib_file_search("","textclass.lst","") else {
            warn!(target:"tclass","Unable to find textclass file `textclass.lst'; try reconfiguring");
            return Err(LayoutError::CatalogNotFound("textclass.lst".to_string()))
        };
        debug!(target:"tclass","Reading textclasses from `{}'",file.display());
        let mut lex = Lexer::new();
        lex.set_file(&file)?;
        self.read_catalog(&mut lex);
        Ok(())
    }

    /// Reads catalog records from `text` (the `textclass.lst` format).
    pub fn read_catalog_str(&mut self,text:&str) {
        self.read_catalog(&mut Lexer::from_str("textclass.lst",text))
    }

    fn read_catalog(&mut self,lex:&mut Lexer) {
        loop {
            if lex.lex() == LexCode::Feof { break }
            let fname = lex.get_string().to_string();
            if !lex.next(true) { break }
            let clname = lex.get_string().to_string();
            if !lex.next(true) { break }
            let desc = lex.get_string().to_string();
            if !lex.next(true) { break }
            let avail = lex.get_bool();
            let mut prereq = String::new();
            let mut category = String::new();
            if !lex.at_line_end() && lex.next(true) {
                prereq = lex.get_string().to_string();
                if !lex.at_line_end() && lex.next(true) { category = lex.get_string().to_string() }
            }
            debug!(target:"tclass","Class {}: {} `{}' (available: {})",fname,clname,desc,avail);
            self.classmap.insert(fname.clone(),LayoutFile::new(&fname,&clname,&desc,&prereq,&category,avail));
        }
        if self.classmap.is_empty() {
            warn!(target:"tclass","No textclasses found!");
        } else {
            info!(target:"tclass","{} textclasses registered",self.classmap.len());
        }
    }

    pub fn have_class(&self,name:&str) -> bool { self.classmap.contains_key(name) }
    pub fn get(&self,name:&str) -> Option<&LayoutFile> { self.classmap.get(name) }
    pub fn get_mut(&mut self,name:&str) -> Option<&mut LayoutFile> { self.classmap.get_mut(name) }
    pub fn iter(&self) -> impl Iterator<Item=(&String,&LayoutFile)> { self.classmap.iter() }
    pub fn len(&self) -> usize { self.classmap.len() }
    pub fn is_empty(&self) -> bool { self.classmap.is_empty() }

    /// Class names, available classes first, then by description (case-insensitively).
    pub fn class_list(&self) -> Vec<String> {
        let mut ret : Vec<&LayoutFile> = self.classmap.values().collect();
        ret.sort_by(|a,b| b.tex_class_avail.cmp(&a.tex_class_avail)
            .then_with(|| a.description().to_lowercase().cmp(&b.description().to_lowercase())));
        ret.into_iter().map(|l| l.name().to_string()).collect()
    }

    /// `article` if known, else the first class, else `None`.
    pub fn default_baseclass(&self) -> Option<String> {
        if self.have_class("article") { return Some("article".to_string()) }
        self.classmap.keys().next().cloned()
    }

    /// Loads the class `name`; see [`LayoutFile::load`].
    pub fn load(&mut self,name:&str,buf_path:Option<&Path>,ctx:&ReadContext) -> Result<&LayoutFile,LayoutError> {
        let lf = self.classmap.get_mut(name).ok_or_else(|| LayoutError::UnknownClass(name.to_string()))?;
        lf.load(buf_path,ctx)?;
        Ok(&*lf)
    }

    /// Replaces the class by an unloaded stub, so the next load reads it from disk again.
    pub fn reset(&mut self,name:&str) -> bool {
        match self.classmap.get_mut(name) {
            Some(lf) => { *lf = lf.stub(); true }
            None => false
        }
    }

    /** Registers a class for a name that has no layout file, e.g. a class required by a
     document but not installed. The class inputs `stdclass.inc` if the library has it and
     otherwise consists of a single `Standard` style.
    */
    pub fn add_empty_class(&mut self,name:&str,ctx:&ReadContext) -> String {
        if let Some(f) = ctx.paths.lib_file_search("layouts",name,"layout") {
            warn!(target:"tclass","Existing textclass {} is not available ({})",name,f.display());
        }
        let mut lf = LayoutFile::new(name,name,&format!("Unknown text class {}",name),&format!("{}.cls",name),"",true);
        let body = if ctx.paths.lib_file_search("layouts","stdclass.inc","").is_some() {
            format!("# This layout is automatically generated\n# \\DeclareLaTeXClass{{{name}}}\n\n\
                Format {LAYOUT_FORMAT}\nInput stdclass.inc\n")
        } else {
            format!("# This layout is automatically generated\n# \\DeclareLaTeXClass{{{name}}}\n\n\
                Format {LAYOUT_FORMAT}\nColumns 1\nSides 1\nSecNumDepth 2\nTocDepth 2\nDefaultStyle Standard\n\n\
                Style Standard\n\tCategory MainText\n\tMargin Static\n\tLatexType Paragraph\n\tLatexName dummy\n\
                \tParIndent MM\n\tParSkip 0.4\n\tAlign Block\n\tAlignPossible Block, Left, Right, Center\n\
                \tLabelType No_Label\nEnd\n")
        };
        match lf.read_str(&body,ReadType::BaseClass,ctx) {
            ReturnValues::Ok => lf.loaded = true,
            _ => warn!(target:"tclass","Error loading the minimal class {}",name)
        }
        self.classmap.insert(name.to_string(),lf);
        name.to_string()
    }

    /** Registers `<dir>/<name>.layout` (or `<dir>/<name>`) as a local class, reading the
     LaTeX class and description from its `\DeclareLaTeXClass` line. Returns the key
     (`LOCAL:<path without extension>`), or `None` if there is no such file or it has no
     declaration. A class with the same key and description is not registered twice.
    */
    pub fn add_local_layout(&mut self,name:&str,dir:&Path,ctx:&ReadContext) -> Option<String> {
        let file = file_search(dir,&format!("{}.layout",name),"").or_else(|| file_search(dir,name,""))?;
        let file = match file.parse_dot() {
            Ok(p) => p.into_owned(),
            Err(_) => file
        };
        let text = std::fs::read_to_string(&file)
            .map_err(|e| warn!(target:"tclass","Cannot read {}: {}",file.display(),e)).ok()?;
        let mut category = String::new();
        for line in text.lines() {
            if let Some(c) = DECLARE_CATEGORY.captures(line) {
                category = c[1].to_string();
                continue
            }
            let Some(c) = DECLARE_CLASS.captures(line) else { continue };
            let latexname = c.get(1).map(|m| m.as_str().trim()).filter(|s| !s.is_empty()).unwrap_or(name);
            let desc = c[2].to_string();
            let key = format!("LOCAL:{}",file.with_extension("").display());
            if let Some(existing) = self.classmap.get(&key) {
                if existing.description() == desc { return Some(key) }
                warn!(target:"tclass","Existing textclass {} is redefined by {}",name,file.display());
            }
            let mut lf = LayoutFile::new(&key,latexname,&desc,&format!("{}.cls",latexname),&category,true);
            lf.path = Some(file.clone());
            // used right away; load now while the directory is known
            if let Err(e) = lf.load(None,ctx) {
                warn!(target:"tclass","Error reading local layout {}: {}",file.display(),e);
            }
            self.classmap.insert(key.clone(),lf);
            return Some(key)
        }
        warn!(target:"tclass","{} does not declare a LaTeX class",file.display());
        None
    }

    /// The catalog in `textclass.lst` format.
    pub fn to_catalog(&self) -> String {
        let mut ret = String::new();
        for lf in self.classmap.values() {
            ret.push_str(&lf.to_catalog_record());
            ret.push('\n');
        }
        ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::test_utils::*;

    #[test]
    fn catalog_lines() {
        let mut list = LayoutFileList::default();
        list.read_catalog_str("# comment\n\"scrbook\" \"scrbook\" \"KOMA-Script Book\" \"true\" \"scrbook.cls\" \"Books\"\n\
            memoir memoir \"Memoir\" false\n");
        assert_eq!(list.len(),2);
        let scr = list.get("scrbook").unwrap();
        assert_eq!(scr.prerequisites(),"scrbook.cls");
        assert_eq!(scr.category(),"Books");
        assert!(!scr.loaded());
        assert_eq!(list.get("memoir").unwrap().category(),"");
        assert_eq!(list.default_baseclass().as_deref(),Some("memoir"));
        assert_eq!(list.class_list(),vec!["scrbook","memoir"]);
        assert_eq!(LayoutFileList::default().default_baseclass(),None);
    }

    #[test]
    fn records_round_trip() {
        let lf = LayoutFile::new("amsart","amsart","American Mathematical Society (AMS) \"Article\"","amsart.cls","Articles",false);
        let mut list = LayoutFileList::default();
        list.read_catalog_str(&lf.to_catalog_record());
        let back = list.get("amsart").unwrap();
        assert_eq!(back.latexname(),lf.latexname());
        assert_eq!(back.description(),lf.description());
        assert_eq!(back.is_tex_class_available(),lf.is_tex_class_available());
        assert_eq!(back.category(),"Articles");
    }

    #[test]
    fn load_is_memoized_until_reset() {
        let lib = LibraryTree::new().file("layouts/article.layout",
            "Format 60\nProvides stdinsets 1\nStyle Standard\nEnd\n");
        let paths = lib.paths();
        let ctx = ReadContext::new(&paths);
        let mut list = LayoutFileList::default();
        list.read_catalog_str("article article \"Article\" true");
        assert!(list.load("article",None,&ctx).is_ok());
        std::fs::remove_file(lib.path().join("layouts/article.layout")).unwrap();
        // no second parse
        assert!(list.load("article",None,&ctx).unwrap().has_layout("Standard"));
        assert!(list.reset("article"));
        assert!(!list.get("article").unwrap().loaded());
        assert_eq!(list.get("article").unwrap().description(),"Article");
        assert!(list.load("article",None,&ctx).is_err());
        assert!(matches!(list.load("nope",None,&ctx),Err(LayoutError::UnknownClass(_))));
        assert!(!list.reset("nope"));
    }

    #[test]
    fn local_layouts() {
        let lib = LibraryTree::new()
            .file("doc/mine.layout","#% Do not delete the line below\n# \\DeclareCategory{Reports}\n\
                # \\DeclareLaTeXClass[report,foo.sty]{My Report}\nFormat 60\nProvides stdinsets 1\nStyle Standard\nEnd\n")
            .file("doc/plain.layout","#\\DeclareLaTeXClass{Plain}\nFormat 60\nProvides stdinsets 1\nStyle Standard\nEnd\n")
            .file("doc/bad.layout","Format 60\n");
        let paths = lib.paths();
        let ctx = ReadContext::new(&paths);
        let mut list = LayoutFileList::default();
        let dir = lib.path().join("doc/../doc");
        let key = list.add_local_layout("mine",&dir,&ctx).unwrap();
        assert!(key.starts_with("LOCAL:"));
        assert!(!key.contains(".."));
        assert!(key.ends_with("mine"));
        let lf = list.get(&key).unwrap();
        assert_eq!(lf.latexname(),"report");
        assert_eq!(lf.description(),"My Report");
        assert_eq!(lf.category(),"Reports");
        assert!(lf.loaded());
        assert_eq!(list.add_local_layout("mine",&lib.path().join("doc"),&ctx).as_deref(),Some(key.as_str()));
        assert_eq!(list.len(),1);
        let plain = list.add_local_layout("plain",&dir,&ctx).unwrap();
        assert_eq!(list.get(&plain).unwrap().latexname(),"plain");
        assert!(list.add_local_layout("bad",&dir,&ctx).is_none());
        assert!(list.add_local_layout("missing",&dir,&ctx).is_none());
        // local classes reload from their own file
        assert!(list.reset(&key));
        assert!(list.load(&key,None,&ctx).is_ok());
    }

    #[test]
    fn empty_classes() {
        let paths = SearchPaths::default();
        let ctx = ReadContext::new(&paths);
        let mut list = LayoutFileList::default();
        let name = list.add_empty_class("foo",&ctx);
        let lf = list.get(&name).unwrap();
        assert!(lf.loaded());
        assert_eq!(lf.default_layout_name(),"Standard");
        assert_eq!(lf.prerequisites(),"foo.cls");
    }
}
