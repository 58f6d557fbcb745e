/*! Regenerating the catalogs from the installed files.

[`scan`] walks the `layouts` and `citeengines` directories of every search root and reads
the header comments of `.layout`, `.module` and `.citeengine` files:

```text
#% Do not delete the line below; configure depends on this
#  \DeclareLaTeXClass[article,foo.sty]{Article (Standard Class)}
#  \DeclareCategory{Articles}

#\DeclareLyXModule[amsthm.sty]{Theorems (AMS)}
#DescriptionBegin
#  Defines theorem environments...
#DescriptionEnd
#Requires: theorems-std | theorems-chap
#Excludes: theorems-starred
#Category: maths
```

A file found in an earlier root shadows files of the same name in later roots.
[`reconfigure`] writes the result as `textclass.lst`, `lyxmodules.lst` and
`lyxciteengines.lst` into the user directory.
*/

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use walkdir::WalkDir;
use crate::citeengines::LyXCiteEngine;
use crate::layoutfile::LayoutFile;
use crate::modules::LyXModule;
use crate::packages::PackageOracle;
use crate::paths::SearchPaths;
use crate::utils::errors::LayoutError;
use crate::utils::{string_from_vector, vector_from_string};

lazy_static! {
    static ref CLASS_DECL : Regex = Regex::new(r"^#\s*\\Declare(LaTeX|DocBook)Class\s*(?:\[([^\]]*)\])?\s*\{(.*)\}\s*$").unwrap();
    static ref CATEGORY_DECL : Regex = Regex::new(r"^#\s*\\DeclareCategory\{(.*)\}\s*$").unwrap();
    static ref MODULE_DECL : Regex = Regex::new(r"^#\s*\\DeclareLyXModule\s*(?:\[([^\]]*)\])?\s*\{(.*)\}").unwrap();
    static ref ENGINE_DECL : Regex = Regex::new(r"^#\s*\\DeclareLyXCiteEngine\s*(?:\[([^\]]*)\])?\s*\{(.*)\}").unwrap();
    static ref DESC_BEGIN : Regex = Regex::new(r"^#+\s*DescriptionBegin\s*$").unwrap();
    static ref DESC_END : Regex = Regex::new(r"^#+\s*DescriptionEnd\s*$").unwrap();
    static ref REQUIRES : Regex = Regex::new(r"^#+\s*Requires:\s*(.*)$").unwrap();
    static ref EXCLUDES : Regex = Regex::new(r"^#+\s*Excludes:\s*(.*)$").unwrap();
    static ref CATEGORY : Regex = Regex::new(r"^#+\s*Category:\s*(.*)$").unwrap();
    static ref ENGINE_TYPE : Regex = Regex::new(r"^\s*CiteEngineType\s+(.*)$").unwrap();
    static ref DEFAULT_BIBLIO : Regex = Regex::new(r"^\s*DefaultBiblio\s+(.*)$").unwrap();
}

/// What [`scan`] found, each list sorted by file stem.
#[derive(Debug,Default)]
pub struct LibraryScan {
    pub classes:Vec<LayoutFile>,
    pub modules:Vec<LyXModule>,
    pub engines:Vec<LyXCiteEngine>
}

/// Reads the headers of all layout, module and cite engine files in the search roots.
/// Unreadable files and files without a declaration are skipped with a warning.
pub fn scan(paths:&SearchPaths,oracle:&dyn PackageOracle) -> LibraryScan {
    let several = paths.roots().len() > 1;
    let mut classes = BTreeMap::new();
    let mut modules = BTreeMap::new();
    let mut engines = BTreeMap::new();
    for (i,root) in paths.roots().iter().enumerate() {
        for (stem,file) in files_in(&root.join("layouts"),"layout") {
            if classes.contains_key(&stem) { continue }
            if let Some(lf) = read_layout_header(&stem,&file,oracle) { classes.insert(stem,lf); }
        }
        for (stem,file) in files_in(&root.join("layouts"),"module") {
            if modules.contains_key(&stem) { continue }
            // modules in the user directory are the user's own
            if let Some(lm) = read_module_header(&stem,&file,several && i == 0) { modules.insert(stem,lm); }
        }
        for (stem,file) in files_in(&root.join("citeengines"),"citeengine") {
            if engines.contains_key(&stem) { continue }
            if let Some(ce) = read_engine_header(&stem,&file) { engines.insert(stem,ce); }
        }
    }
    info!(target:"tclass","Found {} layouts, {} modules and {} cite engines",classes.len(),modules.len(),engines.len());
    LibraryScan {
        classes:classes.into_values().collect(),
        modules:modules.into_values().collect(),
        engines:engines.into_values().collect()
    }
}

/// Scans the library and writes the three catalogs to the user directory.
pub fn reconfigure(paths:&SearchPaths,oracle:&dyn PackageOracle) -> Result<LibraryScan,LayoutError> {
    let dir = paths.user_dir().ok_or_else(|| LayoutError::CatalogNotFound("user directory".to_string()))?;
    let scan = scan(paths,oracle);
    write_catalog(&dir.join("textclass.lst"),
        "# This file declares layouts and their associated definition files\n\
         # (only those files that lyx can handle are used)\n",
        scan.classes.iter().map(LayoutFile::to_catalog_record))?;
    write_catalog(&dir.join("lyxmodules.lst"),
        "## This file declares modules and their associated definition files.\n\
         ## It has been automatically generated by configure\n\
         ## Use \"Options/Reconfigure\" if you need to update it after a\n\
         ## configuration change.\n\
         ## \"ModuleName\" \"filename\" \"Description\" \"Packages\" \"Requires\" \"Excludes\" \"Category\" \"Local\"\n",
        scan.modules.iter().map(LyXModule::to_catalog_record))?;
    write_catalog(&dir.join("lyxciteengines.lst"),
        "## This file declares cite engines and their associated definition files.\n\
         ## It has been automatically generated by configure\n\
         ## Use \"Options/Reconfigure\" if you need to update it after a\n\
         ## configuration change.\n\
         ## \"CiteEngineName\" \"filename\" \"CiteEngineType\" \"DefaultBiblio\" \"Description\" \"Packages\" \"Requires\" \"Excludes\"\n",
        scan.engines.iter().map(LyXCiteEngine::to_catalog_record))?;
    Ok(scan)
}

fn write_catalog<I:Iterator<Item=String>>(file:&Path,header:&str,records:I) -> Result<(),LayoutError> {
    let mut out = header.to_string();
    for r in records {
        out.push_str(&r);
        out.push('\n');
    }
    debug!(target:"tclass","Writing {}",file.display());
    std::fs::write(file,out).map_err(|e| LayoutError::io(file,e))
}

/// `(stem,path)` of the files directly in `dir` with extension `ext`, sorted by name.
fn files_in(dir:&Path,ext:&str) -> Vec<(String,PathBuf)> {
    if !dir.is_dir() { return Vec::new() }
    WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name().into_iter()
        .filter_map(|e| match e {
            Ok(e) => Some(e),
            Err(err) => { warn!(target:"tclass","Error scanning {}: {}",dir.display(),err); None }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|x| x == ext))
        .filter_map(|e| {
            let stem = e.path().file_stem()?.to_str()?.to_string();
            Some((stem,e.into_path()))
        })
        .collect()
}

fn read_header(file:&Path) -> Option<String> {
    match std::fs::read(file) {
        Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
        Err(e) => {
            warn!(target:"tclass","Cannot read {}: {}",file.display(),e);
            None
        }
    }
}

fn read_layout_header(stem:&str,file:&Path,oracle:&dyn PackageOracle) -> Option<LayoutFile> {
    let text = read_header(file)?;
    let mut decl = None;
    let mut category = String::new();
    for line in text.lines() {
        if let Some(c) = CATEGORY_DECL.captures(line) {
            category = c[1].to_string();
        } else if decl.is_none() {
            decl = CLASS_DECL.captures(line).map(|c| (
                &c[1] == "DocBook",
                c.get(2).map_or("",|m| m.as_str()).to_string(),
                c[3].to_string()
            ));
        }
    }
    let Some((docbook,opt,desc)) = decl else {
        debug!(target:"tclass","{} declares no class; skipped",file.display());
        return None
    };
    let mut opts = vector_from_string(&opt,',');
    let latexname = if opts.is_empty() { stem.to_string() } else { opts.remove(0) };
    let mut prereqs = vec![format!("{}.cls",latexname)];
    prereqs.extend(opts.into_iter().map(|p| if p.contains('.') { p } else { format!("{}.sty",p) }));
    let avail = docbook || prereqs.iter().all(|p| oracle.is_available(p));
    debug!(target:"tclass","Layout {}: {} `{}' (available: {})",stem,latexname,desc,avail);
    Some(LayoutFile::new(stem,&latexname,&desc,&string_from_vector(&prereqs,","),&category,avail))
}

/// The text between `DescriptionBegin` and `DescriptionEnd`, comment markers removed and
/// lines joined with spaces.
fn description(text:&str) -> String {
    let mut inside = false;
    let mut parts = Vec::new();
    for line in text.lines() {
        if DESC_BEGIN.is_match(line) { inside = true; continue }
        if DESC_END.is_match(line) { break }
        if inside {
            let l = line.trim_start_matches('#').trim();
            if !l.is_empty() { parts.push(l) }
        }
    }
    parts.join(" ")
}

fn header_field(text:&str,re:&Regex) -> String {
    text.lines().find_map(|l| re.captures(l).map(|c| c[1].trim().to_string())).unwrap_or_default()
}

fn read_module_header(stem:&str,file:&Path,local:bool) -> Option<LyXModule> {
    let text = read_header(file)?;
    let Some(decl) = text.lines().find_map(|l| MODULE_DECL.captures(l)) else {
        warn!(target:"tclass","Module file without \\DeclareLyXModule line: {}",file.display());
        return None
    };
    let packages = vector_from_string(decl.get(1).map_or("",|m| m.as_str()),',');
    let name = decl[2].to_string();
    let requires = vector_from_string(&header_field(&text,&REQUIRES),'|');
    let excludes = vector_from_string(&header_field(&text,&EXCLUDES),'|');
    let category = header_field(&text,&CATEGORY);
    debug!(target:"modules","Module {} ({}): requires {:?}, excludes {:?}",name,stem,requires,excludes);
    Some(LyXModule::new(&name,stem,&description(&text),packages,requires,excludes,&category,local))
}

fn read_engine_header(stem:&str,file:&Path) -> Option<LyXCiteEngine> {
    let text = read_header(file)?;
    let Some(decl) = text.lines().find_map(|l| ENGINE_DECL.captures(l)) else {
        warn!(target:"citeengines","Cite engine file without \\DeclareLyXCiteEngine line: {}",file.display());
        return None
    };
    let packages = vector_from_string(decl.get(1).map_or("",|m| m.as_str()),',');
    let name = decl[2].to_string();
    let types = vector_from_string(&header_field(&text,&ENGINE_TYPE),'|');
    let biblios = vector_from_string(&header_field(&text,&DEFAULT_BIBLIO),'|');
    let requires = vector_from_string(&header_field(&text,&REQUIRES),'|');
    let excludes = vector_from_string(&header_field(&text,&EXCLUDES),'|');
    debug!(target:"citeengines","Cite engine {} ({}): types {:?}",name,stem,types);
    Some(LyXCiteEngine::new(&name,stem,types,biblios,&description(&text),packages,requires,excludes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packages::PackageList;
    use crate::tests::test_utils::LibraryTree;

    #[test]
    fn headers() {
        let lib = LibraryTree::new()
            .file("layouts/article.layout","#% Do not delete the line below\n#  \\DeclareLaTeXClass{Article}\n\
                #  \\DeclareCategory{Articles}\nFormat 60\n")
            .file("layouts/scrartcl.layout","# \\DeclareLaTeXClass[scrartcl,scrlayer-scrpage]{KOMA-Script Article}\nFormat 60\n")
            .file("layouts/docbook.layout","# \\DeclareDocBookClass[article]{DocBook Article}\nFormat 60\n")
            .file("layouts/stdclass.inc","# \\DeclareLaTeXClass{Not a layout}\n")
            .file("layouts/broken.layout","Format 60\n")
            .file("layouts/theorems-ams.module","#\\DeclareLyXModule[amsthm.sty]{Theorems (AMS)}\n#DescriptionBegin\n\
                #  Defines theorem environments\n#  using amsthm.\n#DescriptionEnd\n#Requires: theorems-std | theorems-chap\n\
                #Excludes: theorems-starred\n#Category: maths\n\nFormat 60\n")
            .file("citeengines/natbib.citeengine","# \\DeclareLyXCiteEngine[natbib.sty]{Natbib}\n# DescriptionBegin\n\
                #   Natbib.\n# DescriptionEnd\n# Excludes: basic|jurabib\n\nFormat 60\nCiteEngineType authoryear|numerical\n\
                DefaultBiblio  authoryear:plainnat|numerical:plainnat\n");
        let pl : PackageList = ["article.cls","amsthm"].into_iter().collect();
        let s = scan(&lib.paths(),&pl);

        assert_eq!(s.classes.iter().map(|c| c.name()).collect::<Vec<_>>(),vec!["article","docbook","scrartcl"]);
        let article = &s.classes[0];
        assert_eq!(article.description(),"Article");
        assert_eq!(article.category(),"Articles");
        assert_eq!(article.prerequisites(),"article.cls");
        assert!(article.is_tex_class_available());
        assert!(s.classes[1].is_tex_class_available());
        let koma = &s.classes[2];
        assert_eq!(koma.latexname(),"scrartcl");
        assert_eq!(koma.prerequisites(),"scrartcl.cls,scrlayer-scrpage.sty");
        assert!(!koma.is_tex_class_available());

        let lm = &s.modules[0];
        assert_eq!((lm.id(),lm.name(),lm.category()),("theorems-ams","Theorems (AMS)","maths"));
        assert_eq!(lm.description(),"Defines theorem environments using amsthm.");
        assert_eq!(lm.required_modules(),&["theorems-std".to_string(),"theorems-chap".to_string()]);
        assert_eq!(lm.package_list(),&["amsthm.sty".to_string()]);
        assert!(!lm.is_local());

        let ce = &s.engines[0];
        assert_eq!(ce.id(),"natbib");
        assert_eq!(ce.engine_types(),&["authoryear".to_string(),"numerical".to_string()]);
        assert_eq!(ce.get_default_biblio(crate::citations::CiteEngineType::NUMERICAL),"plainnat");
        assert_eq!(ce.excluded_engines(),&["basic".to_string(),"jurabib".to_string()]);
    }

    #[test]
    fn earlier_roots_shadow_later_ones() {
        let user = LibraryTree::new().file("layouts/mine.module","#\\DeclareLyXModule{Mine (user)}\n");
        let system = LibraryTree::new()
            .file("layouts/mine.module","#\\DeclareLyXModule{Mine (system)}\n")
            .file("layouts/other.module","#\\DeclareLyXModule{Other}\n");
        let s = scan(&SearchPaths::new([user.path(),system.path()]),&crate::packages::AllAvailable);
        assert_eq!(s.modules.len(),2);
        assert_eq!(s.modules[0].name(),"Mine (user)");
        assert!(s.modules[0].is_local());
        assert!(!s.modules[1].is_local());
    }
}
